pub mod manager;
pub mod service;
pub mod storage;
pub mod store;
pub mod types;

pub use manager::SessionManager;
pub use service::AuthApi;
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::SessionStore;
pub use types::{
    AuthResponse, AuthState, LoginCredentials, RefreshResponse, RegisterRequest,
    ResetPasswordConfirm, Session, SessionPatch, UserProfile,
};
