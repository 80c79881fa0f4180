pub mod admin_login_logs;
pub mod admins;
pub mod applications;
pub mod locker_records;
pub mod lockers;
pub mod notifications;
pub mod otp_codes;
pub mod reminders;
pub mod stores;
pub mod users;

pub use admin_login_logs as admin_login_log_entity;
pub use admins as admin_entity;
pub use applications as application_entity;
pub use locker_records as locker_record_entity;
pub use lockers as locker_entity;
pub use notifications as notification_entity;
pub use otp_codes as otp_code_entity;
pub use reminders as reminder_entity;
pub use stores as store_entity;
pub use users as user_entity;

pub use admins::{AdminRole, AdminStatus};
pub use applications::ApplicationStatus;
pub use locker_records::RecordAction;
pub use lockers::LockerStatus;
pub use otp_codes::OtpType;
pub use reminders::ReminderType;
pub use stores::StoreStatus;
pub use users::UserStatus;
