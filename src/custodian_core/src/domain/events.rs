use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{email_address::EmailAddress, phone_number::PhoneNumber, user_id::UserId};

pub const ACCOUNT_CREATED: &str = "account.created";
pub const ACCOUNT_EMAIL_VERIFIED: &str = "account.email_verified";

/// Domain events raised by the `UserAccount` aggregate.
///
/// Events are queued on the aggregate while it is mutated and handed to an
/// `EventPublisher` only after the aggregate has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountEvent {
    AccountCreated {
        event_id: Uuid,
        account_id: UserId,
        email: EmailAddress,
        phone_number: Option<PhoneNumber>,
        occurred_at: DateTime<Utc>,
    },

    EmailVerified {
        event_id: Uuid,
        account_id: UserId,
        email: EmailAddress,
        occurred_at: DateTime<Utc>,
    },
}

impl AccountEvent {
    pub(crate) fn account_created(
        account_id: UserId,
        email: EmailAddress,
        phone_number: Option<PhoneNumber>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::AccountCreated {
            event_id: Uuid::new_v4(),
            account_id,
            email,
            phone_number,
            occurred_at,
        }
    }

    pub(crate) fn email_verified(
        account_id: UserId,
        email: EmailAddress,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::EmailVerified {
            event_id: Uuid::new_v4(),
            account_id,
            email,
            occurred_at,
        }
    }

    /// Routing key subscribers register for.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AccountCreated { .. } => ACCOUNT_CREATED,
            Self::EmailVerified { .. } => ACCOUNT_EMAIL_VERIFIED,
        }
    }

    pub fn event_id(&self) -> Uuid {
        match self {
            Self::AccountCreated { event_id, .. } | Self::EmailVerified { event_id, .. } => {
                *event_id
            }
        }
    }

    pub fn account_id(&self) -> UserId {
        match self {
            Self::AccountCreated { account_id, .. } | Self::EmailVerified { account_id, .. } => {
                *account_id
            }
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::AccountCreated { occurred_at, .. } | Self::EmailVerified { occurred_at, .. } => {
                *occurred_at
            }
        }
    }
}
