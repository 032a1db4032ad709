//! Group orchestrator
//!
//! Creates, edits and deletes groups and manages their resource membership.
//! Each operation resolves the caller and the active roster first, then does
//! all of its store work inside one transaction. Any error inside the
//! transaction rolls the whole operation back.

use anyhow::Context;
use quire_core::models::{
    Group, GroupDetail, GroupInfo, GroupRequest, GroupSearchParams, ReadPermission, ResourceInfo,
    Session, UserInfo, WritePermission,
};
use quire_core::{AppError, AppResult};
use quire_db::{finish, Database, GroupQuery, GroupRecord, LockMode, ResourceQuery, Stores};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::roster::{Roster, UserResolver};

/// Membership changes that turn the current member set into the requested one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    /// Requested but not yet members, in request order
    pub to_add: Vec<Uuid>,
    /// Members that were not requested, in current order
    pub to_remove: Vec<Uuid>,
}

impl MembershipDiff {
    /// Resources present in both sets appear in neither list.
    pub fn between(current: &[Uuid], requested: &[Uuid]) -> Self {
        let current_set: HashSet<Uuid> = current.iter().copied().collect();
        let requested_set: HashSet<Uuid> = requested.iter().copied().collect();

        let mut seen = HashSet::new();
        let to_add = requested
            .iter()
            .copied()
            .filter(|id| !current_set.contains(id) && seen.insert(*id))
            .collect();
        let to_remove = current
            .iter()
            .copied()
            .filter(|id| !requested_set.contains(id))
            .collect();

        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Drops repeated IDs, keeping the first occurrence.
pub(crate) fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

pub struct GroupService<D: Database> {
    db: Arc<D>,
    stores: Stores<D::Tx>,
    users: UserResolver,
}

impl<D: Database> Clone for GroupService<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            stores: self.stores.clone(),
            users: self.users.clone(),
        }
    }
}

impl<D: Database> GroupService<D> {
    pub fn new(db: Arc<D>, stores: Stores<D::Tx>, users: UserResolver) -> Self {
        Self { db, stores, users }
    }

    #[tracing::instrument(skip(self, session, request), fields(group.name = %request.name))]
    pub async fn create_group(
        &self,
        session: &Session,
        request: GroupRequest,
    ) -> AppResult<GroupDetail> {
        request.validate()?;

        let user = self.users.me(session).await?;

        let group = Group::from_request(&request);
        if !group.is_valid_permission() {
            return Err(AppError::InvalidPermission);
        }

        let roster = self.users.roster(session).await?;
        let member_ids = dedup_ids(&request.resource_ids);

        let mut tx = self.db.begin().await?;
        let outcome = self
            .create_group_tx(&mut tx, &roster, &user, &group, &request, &member_ids)
            .await;
        let main_resource = finish(&*self.db, tx, outcome).await?;

        tracing::info!(
            group.id = %group.id,
            user.id = %user.id,
            member_count = member_ids.len(),
            "Group created"
        );

        Ok(GroupDetail {
            group,
            administrators: vec![user],
            main_resource,
        })
    }

    async fn create_group_tx(
        &self,
        tx: &mut D::Tx,
        roster: &Roster,
        user: &UserInfo,
        group: &Group,
        request: &GroupRequest,
        member_ids: &[Uuid],
    ) -> AppResult<ResourceInfo> {
        let main_resource = self
            .resolve_main_resource(tx, roster, request.main_resource_id)
            .await?;
        self.ensure_resources_exist(tx, member_ids).await?;

        self.stores
            .groups
            .save_group(tx, group, request.main_resource_id)
            .await
            .context("Failed to save group")?;
        self.stores
            .groups
            .add_resources(tx, group.id, member_ids)
            .await
            .context("Failed to save group resources")?;
        self.stores
            .administrators
            .save_administrators(tx, group.id, &[user.id])
            .await
            .context("Failed to save administrators")?;

        Ok(main_resource)
    }

    #[tracing::instrument(skip(self, session, request), fields(group.id = %group_id))]
    pub async fn edit_group(
        &self,
        session: &Session,
        group_id: Uuid,
        request: GroupRequest,
    ) -> AppResult<GroupDetail> {
        request.validate()?;

        let user = self.users.me(session).await?;
        let roster = self.users.roster(session).await?;
        let member_ids = dedup_ids(&request.resource_ids);

        let mut tx = self.db.begin().await?;
        let outcome = self
            .edit_group_tx(&mut tx, &roster, &user, group_id, &request, &member_ids)
            .await;
        let (group, administrator_ids, main_resource) = finish(&*self.db, tx, outcome).await?;

        tracing::info!(group.id = %group_id, user.id = %user.id, "Group edited");

        Ok(GroupDetail {
            group,
            administrators: display_administrators(&roster, &administrator_ids),
            main_resource,
        })
    }

    async fn edit_group_tx(
        &self,
        tx: &mut D::Tx,
        roster: &Roster,
        user: &UserInfo,
        group_id: Uuid,
        request: &GroupRequest,
        member_ids: &[Uuid],
    ) -> AppResult<(Group, Vec<Uuid>, ResourceInfo)> {
        let record = self.lock_group(tx, group_id).await?;
        let administrator_ids = self.get_administrator_ids(tx, group_id).await?;
        if !administrator_ids.contains(&user.id) {
            return Err(forbidden_not_admin(group_id));
        }

        let main_resource = self
            .resolve_main_resource(tx, roster, request.main_resource_id)
            .await?;
        self.ensure_resources_exist(tx, member_ids).await?;

        let mut group = record.group;
        let fields_changed = group.apply(request);
        if !group.is_valid_permission() {
            return Err(AppError::InvalidPermission);
        }

        let main_changed = record.main_resource.resource.id != request.main_resource_id;
        if fields_changed || main_changed {
            let affected = self
                .stores
                .groups
                .edit_group(tx, &group, request.main_resource_id)
                .await
                .context("Failed to update group")?;
            if affected == 0 {
                tracing::debug!(group.id = %group_id, "Group update affected no rows");
            }
        }

        let current = self
            .stores
            .groups
            .get_member_ids(tx, group_id)
            .await
            .context("Failed to get group members")?;
        let diff = MembershipDiff::between(&current, member_ids);

        self.stores
            .groups
            .add_resources(tx, group_id, &diff.to_add)
            .await
            .context("Failed to add group resources")?;
        self.stores
            .groups
            .delete_resources(tx, group_id, &diff.to_remove)
            .await
            .context("Failed to remove group resources")?;

        tracing::debug!(
            group.id = %group_id,
            added = diff.to_add.len(),
            removed = diff.to_remove.len(),
            "Reconciled group membership"
        );

        Ok((group, administrator_ids, main_resource))
    }

    #[tracing::instrument(skip(self, session), fields(group.id = %group_id))]
    pub async fn delete_group(&self, session: &Session, group_id: Uuid) -> AppResult<()> {
        let user = self.users.me(session).await?;

        let mut tx = self.db.begin().await?;
        let outcome = self.delete_group_tx(&mut tx, &user, group_id).await;
        finish(&*self.db, tx, outcome).await?;

        tracing::info!(group.id = %group_id, user.id = %user.id, "Group deleted");
        Ok(())
    }

    async fn delete_group_tx(
        &self,
        tx: &mut D::Tx,
        user: &UserInfo,
        group_id: Uuid,
    ) -> AppResult<()> {
        self.lock_group(tx, group_id).await?;

        let administrator_ids = self.get_administrator_ids(tx, group_id).await?;
        if !administrator_ids.contains(&user.id) {
            return Err(forbidden_not_admin(group_id));
        }

        self.stores
            .groups
            .delete_group(tx, group_id)
            .await
            .context("Failed to delete group")?;

        Ok(())
    }

    /// Adds one resource to a group and returns the new member list, the added
    /// resource first.
    #[tracing::instrument(skip(self, session), fields(group.id = %group_id, resource.id = %resource_id))]
    pub async fn add_resource(
        &self,
        session: &Session,
        group_id: Uuid,
        resource_id: Uuid,
    ) -> AppResult<Vec<ResourceInfo>> {
        let user = self.users.me(session).await?;
        let roster = self.users.roster(session).await?;

        let mut tx = self.db.begin().await?;
        let outcome = self
            .add_resource_tx(&mut tx, &roster, &user, group_id, resource_id)
            .await;
        let members = finish(&*self.db, tx, outcome).await?;

        tracing::info!(
            group.id = %group_id,
            resource.id = %resource_id,
            member_count = members.len(),
            "Resource added to group"
        );

        Ok(members)
    }

    async fn add_resource_tx(
        &self,
        tx: &mut D::Tx,
        roster: &Roster,
        user: &UserInfo,
        group_id: Uuid,
        resource_id: Uuid,
    ) -> AppResult<Vec<ResourceInfo>> {
        let record = self.lock_group(tx, group_id).await?;

        let resource = self
            .stores
            .resources
            .get_resource(tx, resource_id)
            .await
            .context("Failed to get resource")?
            .ok_or_else(|| AppError::NoResource(format!("Resource {} not found", resource_id)))?;
        let added = roster.resource_info(resource)?;

        if record.group.write_permission != WritePermission::Public {
            let administrator_ids = self.get_administrator_ids(tx, group_id).await?;
            if !administrator_ids.contains(&user.id) {
                return Err(forbidden_not_admin(group_id));
            }
        }

        let existing = self
            .stores
            .resources
            .get_resources(tx, &ResourceQuery::members_of(group_id))
            .await
            .context("Failed to get group resources")?;
        if existing.iter().any(|r| r.resource.id == resource_id) {
            return Err(AppError::ResourceAlreadyExists(format!(
                "Resource {} is already in group {}",
                resource_id, group_id
            )));
        }

        self.stores
            .groups
            .add_resources(tx, group_id, &[resource_id])
            .await
            .context("Failed to add group resource")?;

        let mut members = Vec::with_capacity(existing.len() + 1);
        members.push(added);
        for record in existing {
            members.push(roster.resource_info(record)?);
        }

        Ok(members)
    }

    #[tracing::instrument(skip(self, session), fields(group.id = %group_id))]
    pub async fn get_group(&self, session: &Session, group_id: Uuid) -> AppResult<GroupDetail> {
        let user = self.users.me(session).await?;
        let roster = self.users.roster(session).await?;

        let mut tx = self.db.begin().await?;
        let outcome = self.get_group_tx(&mut tx, &user, group_id).await;
        let (record, administrator_ids) = finish(&*self.db, tx, outcome).await?;

        Ok(GroupDetail {
            group: record.group,
            administrators: display_administrators(&roster, &administrator_ids),
            main_resource: roster.resource_info(record.main_resource)?,
        })
    }

    async fn get_group_tx(
        &self,
        tx: &mut D::Tx,
        user: &UserInfo,
        group_id: Uuid,
    ) -> AppResult<(GroupRecord, Vec<Uuid>)> {
        let record = self
            .stores
            .groups
            .get_group(tx, group_id, LockMode::None)
            .await
            .context("Failed to get group")?
            .ok_or_else(|| no_group(group_id))?;
        let administrator_ids = self.get_administrator_ids(tx, group_id).await?;

        if record.group.read_permission != ReadPermission::Public
            && !administrator_ids.contains(&user.id)
        {
            return Err(AppError::Forbidden(format!(
                "Group {} is private to its administrators",
                group_id
            )));
        }

        Ok((record, administrator_ids))
    }

    /// Lists groups filtered by type and main-resource creator. Private groups
    /// are listed too; only `get_group` checks read permission.
    #[tracing::instrument(skip(self, session, params))]
    pub async fn get_groups(
        &self,
        session: &Session,
        params: &GroupSearchParams,
    ) -> AppResult<Vec<GroupInfo>> {
        self.users.me(session).await?;
        let roster = self.users.roster(session).await?;

        let query = GroupQuery {
            group_types: params.group_types.clone(),
            creator_ids: roster.resolve_names(&params.users)?,
            limit: params.limit,
            offset: params.offset,
        };

        let mut tx = self.db.begin().await?;
        let outcome = self
            .stores
            .groups
            .get_groups(&mut tx, &query)
            .await
            .context("Failed to list groups")
            .map_err(AppError::from);
        let records = finish(&*self.db, tx, outcome).await?;

        records
            .into_iter()
            .map(|record| {
                Ok(GroupInfo {
                    group: record.group,
                    main_resource: roster.resource_info(record.main_resource)?,
                })
            })
            .collect()
    }

    async fn lock_group(
        &self,
        tx: &mut D::Tx,
        group_id: Uuid,
    ) -> AppResult<GroupRecord> {
        self.stores
            .groups
            .get_group(tx, group_id, LockMode::Record)
            .await
            .context("Failed to get group")?
            .ok_or_else(|| no_group(group_id))
    }

    async fn get_administrator_ids(&self, tx: &mut D::Tx, group_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .stores
            .administrators
            .get_administrators(tx, group_id)
            .await
            .context("Failed to get administrators")?)
    }

    async fn resolve_main_resource(
        &self,
        tx: &mut D::Tx,
        roster: &Roster,
        resource_id: Uuid,
    ) -> AppResult<ResourceInfo> {
        let record = self
            .stores
            .resources
            .get_resource(tx, resource_id)
            .await
            .context("Failed to get main resource")?
            .ok_or_else(|| {
                AppError::NoResource(format!("Main resource {} not found", resource_id))
            })?;

        roster.resource_info(record)
    }

    /// Fails with `NoResource` unless every ID exists. `ids` must be free of
    /// duplicates.
    async fn ensure_resources_exist(&self, tx: &mut D::Tx, ids: &[Uuid]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let found = self
            .stores
            .resources
            .get_resources_by_ids(tx, ids, LockMode::None)
            .await
            .context("Failed to get resources")?;

        if found.len() != ids.len() {
            let found: HashSet<Uuid> = found.iter().map(|r| r.id).collect();
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !found.contains(*id))
                .map(Uuid::to_string)
                .collect();
            return Err(AppError::NoResource(format!(
                "Resources not found: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }
}

/// Administrators who have left the active roster are left out of the display list.
fn display_administrators(roster: &Roster, ids: &[Uuid]) -> Vec<UserInfo> {
    ids.iter()
        .filter_map(|id| {
            let user = roster.get(*id).cloned();
            if user.is_none() {
                tracing::debug!(user.id = %id, "Administrator is not an active member");
            }
            user
        })
        .collect()
}

fn no_group(group_id: Uuid) -> AppError {
    AppError::NoGroup(format!("Group {} not found", group_id))
}

fn forbidden_not_admin(group_id: Uuid) -> AppError {
    AppError::Forbidden(format!("Not an administrator of group {}", group_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_diff_is_set_difference() {
        let v = ids(4);
        let (a, b, c, d) = (v[0], v[1], v[2], v[3]);

        let diff = MembershipDiff::between(&[a, b, c], &[b, c, d]);

        assert_eq!(diff.to_add, vec![d]);
        assert_eq!(diff.to_remove, vec![a]);
    }

    #[test]
    fn test_diff_of_equal_sets_is_empty() {
        let v = ids(3);
        let reordered = vec![v[2], v[0], v[1]];

        assert!(MembershipDiff::between(&v, &reordered).is_empty());
    }

    #[test]
    fn test_diff_from_and_to_empty() {
        let v = ids(2);

        let diff = MembershipDiff::between(&[], &v);
        assert_eq!(diff.to_add, v);
        assert!(diff.to_remove.is_empty());

        let diff = MembershipDiff::between(&v, &[]);
        assert!(diff.to_add.is_empty());
        assert_eq!(diff.to_remove, v);
    }

    #[test]
    fn test_diff_ignores_repeated_requests() {
        let v = ids(2);

        let diff = MembershipDiff::between(&[v[0]], &[v[1], v[1], v[0]]);

        assert_eq!(diff.to_add, vec![v[1]]);
        assert!(diff.to_remove.is_empty());
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let v = ids(3);

        assert_eq!(
            dedup_ids(&[v[1], v[0], v[1], v[2], v[0]]),
            vec![v[1], v[0], v[2]]
        );
    }
}
