//! Newsletter subscriber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use seamline_core::{Email, SubscriberId};

/// A row from the `newsletter_subscribers` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}
