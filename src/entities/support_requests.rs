use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "support_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// "support", "feedback", "bug_report" or "feature_request"
    pub kind: String,

    pub user_email: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    /// "iOS", "Android" or "Web"
    pub platform: String,

    pub app_version: String,

    pub device_model: String,

    /// Name of the mobile app the ticket was filed from
    pub app: String,

    /// "new", "in_progress" or "resolved"
    pub status: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub admin_notes: Option<String>,

    pub created_at: String,

    pub updated_at: String,

    pub deleted_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
