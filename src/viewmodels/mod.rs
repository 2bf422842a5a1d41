pub mod manager_viewmodel;
pub mod upload_viewmodel;

pub use manager_viewmodel::ManagerViewModel;
pub use upload_viewmodel::{UploadProgress, UploadViewModel};
