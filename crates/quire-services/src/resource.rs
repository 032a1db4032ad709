//! Resource orchestrator

use anyhow::Context;
use quire_core::models::{
    CreateResourceRequest, File, Resource, ResourceInfo, ResourceSearchParams, Session,
};
use quire_core::{AppError, AppResult};
use quire_db::{finish, Database, LockMode, ResourceQuery, ResourceRecord, Stores};
use quire_storage::{file_key, Storage};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::file::{storage_error, FileDownload};
use crate::roster::UserResolver;

pub struct ResourceService<D: Database> {
    db: Arc<D>,
    stores: Stores<D::Tx>,
    users: UserResolver,
    storage: Arc<dyn Storage>,
}

impl<D: Database> Clone for ResourceService<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            stores: self.stores.clone(),
            users: self.users.clone(),
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<D: Database> ResourceService<D> {
    pub fn new(
        db: Arc<D>,
        stores: Stores<D::Tx>,
        users: UserResolver,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            db,
            stores,
            users,
            storage,
        }
    }

    /// Wraps a file the caller uploaded into a new resource.
    #[tracing::instrument(skip(self, session, request), fields(file.id = %request.file_id))]
    pub async fn create_resource(
        &self,
        session: &Session,
        request: CreateResourceRequest,
    ) -> AppResult<ResourceInfo> {
        request.validate()?;

        let user = self.users.me(session).await?;
        let resource = Resource::new(
            request.name.clone(),
            request.resource_type,
            request.comment.clone(),
        );

        let mut tx = self.db.begin().await?;
        let outcome = self
            .create_resource_tx(&mut tx, user.id, &resource, &request)
            .await;
        let file = finish(&*self.db, tx, outcome).await?;

        tracing::info!(
            resource.id = %resource.id,
            user.id = %user.id,
            resource.resource_type = %resource.resource_type,
            "Resource created"
        );

        Ok(ResourceInfo {
            resource,
            file,
            creator: user,
        })
    }

    async fn create_resource_tx(
        &self,
        tx: &mut D::Tx,
        user_id: Uuid,
        resource: &Resource,
        request: &CreateResourceRequest,
    ) -> AppResult<File> {
        let record = self
            .stores
            .files
            .get_file(tx, request.file_id, LockMode::Record)
            .await
            .context("Failed to get file")?
            .ok_or_else(|| AppError::NoFile(format!("File {} not found", request.file_id)))?;

        if record.creator_id != user_id {
            return Err(AppError::Forbidden(format!(
                "File {} belongs to another user",
                request.file_id
            )));
        }

        if !request.resource_type.accepts(record.file.file_type) {
            return Err(AppError::InvalidResourceType(format!(
                "A {} file cannot back a resource of type {}",
                record.file.file_type, request.resource_type
            )));
        }

        self.stores
            .resources
            .save_resource(tx, request.file_id, resource)
            .await
            .context("Failed to save resource")?;

        Ok(record.file)
    }

    #[tracing::instrument(skip(self, session), fields(resource.id = %resource_id))]
    pub async fn get_resource(
        &self,
        session: &Session,
        resource_id: Uuid,
    ) -> AppResult<ResourceInfo> {
        let roster = self.users.roster(session).await?;

        let mut tx = self.db.begin().await?;
        let outcome = self.load_resource(&mut tx, resource_id).await;
        let record = finish(&*self.db, tx, outcome).await?;

        roster.resource_info(record)
    }

    /// Lists resources newest first. User filters are display names and fail
    /// with `NoUser` when a name is not an active member.
    #[tracing::instrument(skip(self, session, params))]
    pub async fn get_resources(
        &self,
        session: &Session,
        params: &ResourceSearchParams,
    ) -> AppResult<Vec<ResourceInfo>> {
        let roster = self.users.roster(session).await?;

        let query = ResourceQuery {
            resource_types: params.resource_types.clone(),
            creator_ids: roster.resolve_names(&params.users)?,
            group_ids: params.groups.clone(),
            limit: params.limit,
            offset: params.offset,
        };

        let mut tx = self.db.begin().await?;
        let outcome = self
            .stores
            .resources
            .get_resources(&mut tx, &query)
            .await
            .context("Failed to list resources")
            .map_err(AppError::from);
        let records = finish(&*self.db, tx, outcome).await?;

        records
            .into_iter()
            .map(|record| roster.resource_info(record))
            .collect()
    }

    /// Bytes of the file backing a resource.
    #[tracing::instrument(skip(self), fields(resource.id = %resource_id))]
    pub async fn download_resource_file(&self, resource_id: Uuid) -> AppResult<FileDownload> {
        let mut tx = self.db.begin().await?;
        let outcome = self
            .stores
            .files
            .get_file_by_resource_id(&mut tx, resource_id)
            .await
            .context("Failed to get resource file")
            .map_err(AppError::from)
            .and_then(|file| {
                file.ok_or_else(|| {
                    AppError::NoResource(format!("Resource {} not found", resource_id))
                })
            });
        let file = finish(&*self.db, tx, outcome).await?;

        let data = self
            .storage
            .download(&file_key(file.id))
            .await
            .map_err(|e| storage_error(file.id, e))?;

        Ok(FileDownload { file, data })
    }

    async fn load_resource(&self, tx: &mut D::Tx, resource_id: Uuid) -> AppResult<ResourceRecord> {
        self.stores
            .resources
            .get_resource(tx, resource_id)
            .await
            .context("Failed to get resource")?
            .ok_or_else(|| AppError::NoResource(format!("Resource {} not found", resource_id)))
    }
}
