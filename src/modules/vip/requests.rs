use super::status::TransitionError;
use crate::db::entities::vip_requests::{self, VipStatus};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

#[derive(Debug, thiserror::Error)]
pub enum VipError {
    #[error(transparent)]
    Db(#[from] DbErr),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("VIP request #{0} does not exist")]
    NotFound(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVipRequest {
    pub user_id: i64,
    pub username: String,
    pub request_type: String,
    pub staff_id: Option<i64>,
    pub request_data: Option<String>,
}

/// Open a request in `pending`.
pub async fn create_vip_request<C: ConnectionTrait>(
    db: &C,
    request: NewVipRequest,
) -> Result<vip_requests::Model, DbErr> {
    insert(db, request, VipStatus::Pending).await
}

/// Record a conversion that already happened (role granted outside a request).
pub async fn record_completed_request<C: ConnectionTrait>(
    db: &C,
    request: NewVipRequest,
) -> Result<vip_requests::Model, DbErr> {
    insert(db, request, VipStatus::Completed).await
}

async fn insert<C: ConnectionTrait>(
    db: &C,
    request: NewVipRequest,
    status: VipStatus,
) -> Result<vip_requests::Model, DbErr> {
    let now = Utc::now();
    vip_requests::ActiveModel {
        user_id: Set(request.user_id),
        username: Set(request.username),
        request_type: Set(request.request_type),
        staff_id: Set(request.staff_id),
        status: Set(status),
        vantage_email: Set(None),
        request_data: Set(request.request_data),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Move a request to `status`, optionally recording the account email.
/// Illegal moves fail without writing.
pub async fn update_vip_request_status<C: ConnectionTrait>(
    db: &C,
    request_id: i32,
    status: VipStatus,
    vantage_email: Option<&str>,
) -> Result<vip_requests::Model, VipError> {
    let current = vip_requests::Entity::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or(VipError::NotFound(request_id))?;

    let next = current.status.transition(status)?;

    let mut active: vip_requests::ActiveModel = current.into();
    active.status = Set(next);
    if let Some(email) = vantage_email {
        active.vantage_email = Set(Some(email.to_string()));
    }
    active.updated_at = Set(Utc::now());

    Ok(active.update(db).await?)
}

/// Requests newest first; `None` lists every status.
pub async fn get_vip_requests_by_status<C: ConnectionTrait>(
    db: &C,
    status: Option<VipStatus>,
) -> Result<Vec<vip_requests::Model>, DbErr> {
    let mut query = vip_requests::Entity::find();
    if let Some(status) = status {
        query = query.filter(vip_requests::Column::Status.eq(status));
    }
    query
        .order_by_desc(vip_requests::Column::CreatedAt)
        .order_by_desc(vip_requests::Column::Id)
        .all(db)
        .await
}

pub async fn get_user_vip_requests<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
) -> Result<Vec<vip_requests::Model>, DbErr> {
    vip_requests::Entity::find()
        .filter(vip_requests::Column::UserId.eq(user_id))
        .order_by_desc(vip_requests::Column::CreatedAt)
        .order_by_desc(vip_requests::Column::Id)
        .all(db)
        .await
}

pub async fn has_completed_request<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
) -> Result<bool, DbErr> {
    let count = vip_requests::Entity::find()
        .filter(vip_requests::Column::UserId.eq(user_id))
        .filter(vip_requests::Column::Status.eq(VipStatus::Completed))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn count_for_staff<C: ConnectionTrait>(
    db: &C,
    staff_id: i64,
    status: VipStatus,
) -> Result<u64, DbErr> {
    vip_requests::Entity::find()
        .filter(vip_requests::Column::StaffId.eq(staff_id))
        .filter(vip_requests::Column::Status.eq(status))
        .count(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    fn request(user_id: i64) -> NewVipRequest {
        NewVipRequest {
            user_id,
            username: format!("member{user_id}"),
            request_type: "new_account".into(),
            staff_id: Some(100),
            request_data: None,
        }
    }

    #[tokio::test]
    async fn test_request_walks_forward_to_completion() {
        let db = test_connection().await;
        let created = create_vip_request(&db, request(1)).await.unwrap();
        assert_eq!(created.status, VipStatus::Pending);

        update_vip_request_status(&db, created.id, VipStatus::EmailSent, None)
            .await
            .unwrap();
        let account = update_vip_request_status(
            &db,
            created.id,
            VipStatus::AccountCreated,
            Some("member1@example.com"),
        )
        .await
        .unwrap();
        assert_eq!(account.vantage_email.as_deref(), Some("member1@example.com"));

        let done = update_vip_request_status(&db, created.id, VipStatus::Completed, None)
            .await
            .unwrap();
        assert_eq!(done.status, VipStatus::Completed);
        // The email survives later updates that do not carry one.
        assert_eq!(done.vantage_email.as_deref(), Some("member1@example.com"));
        assert!(has_completed_request(&db, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_illegal_move_does_not_write() {
        let db = test_connection().await;
        let created = create_vip_request(&db, request(1)).await.unwrap();
        update_vip_request_status(&db, created.id, VipStatus::Denied, None)
            .await
            .unwrap();

        let err = update_vip_request_status(&db, created.id, VipStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, VipError::Transition(_)));

        let stored = get_user_vip_requests(&db, 1).await.unwrap();
        assert_eq!(stored[0].status, VipStatus::Denied);
    }

    #[tokio::test]
    async fn test_missing_request_is_reported() {
        let db = test_connection().await;
        let err = update_vip_request_status(&db, 42, VipStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, VipError::NotFound(42)));
    }

    #[tokio::test]
    async fn test_filter_by_status() {
        let db = test_connection().await;
        create_vip_request(&db, request(1)).await.unwrap();
        create_vip_request(&db, request(2)).await.unwrap();
        record_completed_request(&db, request(3)).await.unwrap();

        let pending = get_vip_requests_by_status(&db, Some(VipStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(get_vip_requests_by_status(&db, None).await.unwrap().len(), 3);
        assert_eq!(count_for_staff(&db, 100, VipStatus::Completed).await.unwrap(), 1);
    }
}
