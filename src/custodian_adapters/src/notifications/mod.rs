pub mod mock_notification_service;
pub mod postmark_notification_service;

pub use mock_notification_service::{MockNotificationService, SentNotification};
pub use postmark_notification_service::PostmarkNotificationService;
