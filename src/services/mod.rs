pub mod application_service;
pub mod auth_service;
pub mod locker_service;
pub mod notification_service;
pub mod reminder_service;
pub mod store_service;

pub use application_service::ApplicationService;
pub use auth_service::AuthService;
pub use locker_service::LockerService;
pub use notification_service::NotificationService;
pub use reminder_service::ReminderService;
pub use store_service::StoreService;
