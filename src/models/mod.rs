pub mod session;
pub mod upload;
pub mod permission;
pub mod publish;

pub use session::{Session, TokenDescriptor, TokenInput, UrlMap};
pub use upload::{LayerSummary, LayerUrls, PageMeta, UploadRecord, UploadUser, UploadsPage};
pub use permission::{has_capability, Permission, PermissionMap, PermissionOp};
pub use publish::{
    CompatibleLayer, CompatibleLayerUrls, EsriPublishResponse, PublishResponse, RemoteLayer, SchemaCheck,
    SchemaField, TaskState,
};
