use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use mongodb::bson::{oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::model::service::{Service, ServiceBrief, ServiceResponse};
use crate::model::user::UserBrief;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(()),
        }
    }
}

// Document shape stored in the `bookings` collection. `service` and `user`
// are references by id; the owner is always the authenticated requester.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub service: ObjectId,
    pub user: ObjectId,
    pub status: BookingStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub booking_date: DateTime<Utc>,
    pub address: String,
    pub total_amount: f64,
    pub additional_info: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

// Listing shape: booking fields plus service (title, price) and user
// (name, email) summaries joined in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub service: Option<ServiceBrief>,
    pub user: Option<UserBrief>,
    pub status: BookingStatus,
    pub booking_date: String,
    pub address: String,
    pub total_amount: f64,
    pub additional_info: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl BookingResponse {
    pub fn new(booking: Booking, service: Option<ServiceBrief>, user: Option<UserBrief>) -> Self {
        Self {
            id: booking.id.map(|id| id.to_hex()).unwrap_or_default(),
            service,
            user,
            status: booking.status,
            booking_date: booking.booking_date.to_rfc3339(),
            address: booking.address,
            total_amount: booking.total_amount,
            additional_info: booking.additional_info,
            created_at: booking.created_at.to_rfc3339(),
            updated_at: booking.updated_at.to_rfc3339(),
        }
    }
}

// Single-booking shape: the full service record is embedded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    pub id: String,
    pub service: Option<ServiceResponse>,
    pub user: Option<UserBrief>,
    pub status: BookingStatus,
    pub booking_date: String,
    pub address: String,
    pub total_amount: f64,
    pub additional_info: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl BookingDetail {
    pub fn new(booking: Booking, service: Option<Service>, user: Option<UserBrief>) -> Self {
        Self {
            id: booking.id.map(|id| id.to_hex()).unwrap_or_default(),
            service: service.map(ServiceResponse::from),
            user,
            status: booking.status,
            booking_date: booking.booking_date.to_rfc3339(),
            address: booking.address,
            total_amount: booking.total_amount,
            additional_info: booking.additional_info,
            created_at: booking.created_at.to_rfc3339(),
            updated_at: booking.updated_at.to_rfc3339(),
        }
    }
}

// Accepts RFC 3339 or a bare YYYY-MM-DD (treated as midnight UTC).
pub fn parse_booking_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(raw) {
        return Some(date_time.with_timezone(&Utc));
    }
    raw.parse::<NaiveDate>()
        .ok()
        .map(|date| DateTime::from_naive_utc_and_offset(date.and_time(NaiveTime::MIN), Utc))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingInput {
    pub service: Option<String>,
    pub booking_date: Option<String>,
    pub address: Option<String>,
    pub total_amount: Option<f64>,
    pub additional_info: Option<String>,
    pub status: Option<String>,
}

impl BookingInput {
    // Full validation for POST. `status` in the body is ignored here: new
    // bookings always start out pending.
    pub fn into_booking(self, owner: ObjectId) -> Result<Booking, Vec<FieldError>> {
        let mut errors = Vec::new();

        let service = match self.service.as_deref().map(ObjectId::parse_str) {
            Some(Ok(id)) => Some(id),
            _ => {
                errors.push(FieldError::new("service", "service must be a valid id"));
                None
            }
        };
        let booking_date = match self.booking_date.as_deref().map(parse_booking_date) {
            Some(Some(date)) => Some(date),
            _ => {
                errors.push(FieldError::new(
                    "bookingDate",
                    "bookingDate must be a valid date",
                ));
                None
            }
        };
        let address = match self.address {
            Some(address) if !address.trim().is_empty() => Some(address),
            _ => {
                errors.push(FieldError::new("address", "address is required"));
                None
            }
        };
        let total_amount = match self.total_amount {
            Some(amount) if amount > 0.0 => Some(amount),
            _ => {
                errors.push(FieldError::new(
                    "totalAmount",
                    "totalAmount must be a positive number",
                ));
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let now = Utc::now();
        Ok(Booking {
            id: None,
            service: service.unwrap_or_default(),
            user: owner,
            status: BookingStatus::Pending,
            booking_date: booking_date.unwrap_or(now),
            address: address.unwrap_or_default(),
            total_amount: total_amount.unwrap_or_default(),
            additional_info: self.additional_info,
            created_at: now,
            updated_at: now,
        })
    }

    // Partial validation for PUT, producing a `$set` document. The service
    // and user references are fixed at creation and cannot be reassigned.
    pub fn into_update(self) -> Result<Document, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut set = Document::new();

        if let Some(status) = self.status.as_deref() {
            match BookingStatus::from_str(status) {
                Ok(status) => {
                    set.insert("status", status.as_str());
                }
                Err(()) => errors.push(FieldError::new(
                    "status",
                    "status must be one of: pending, confirmed, completed, cancelled",
                )),
            }
        }
        if let Some(raw) = self.booking_date.as_deref() {
            match parse_booking_date(raw) {
                Some(date) => {
                    set.insert(
                        "bookingDate",
                        Bson::DateTime(mongodb::bson::DateTime::from_chrono(date)),
                    );
                }
                None => errors.push(FieldError::new(
                    "bookingDate",
                    "bookingDate must be a valid date",
                )),
            }
        }
        if let Some(address) = self.address {
            if address.trim().is_empty() {
                errors.push(FieldError::new("address", "address is required"));
            } else {
                set.insert("address", address);
            }
        }
        if let Some(amount) = self.total_amount {
            if amount > 0.0 {
                set.insert("totalAmount", amount);
            } else {
                errors.push(FieldError::new(
                    "totalAmount",
                    "totalAmount must be a positive number",
                ));
            }
        }
        if let Some(info) = self.additional_info {
            set.insert("additionalInfo", info);
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        if set.is_empty() {
            return Err(vec![FieldError::new("body", "no fields to update")]);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn valid_input() -> BookingInput {
        BookingInput {
            service: Some(ObjectId::new().to_hex()),
            booking_date: Some("2024-05-01".into()),
            address: Some("1 Main St".into()),
            total_amount: Some(80.0),
            ..Default::default()
        }
    }

    #[test]
    fn valid_input_becomes_a_pending_booking() {
        let owner = ObjectId::new();
        let booking = valid_input().into_booking(owner).unwrap();
        assert_eq!(booking.user, owner);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.booking_date.year(), 2024);
        assert_eq!(booking.booking_date.month(), 5);
        assert!(booking.id.is_none());
    }

    #[test]
    fn status_in_create_body_is_ignored() {
        let mut input = valid_input();
        input.status = Some("completed".into());
        let booking = input.into_booking(ObjectId::new()).unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[test]
    fn malformed_service_id_is_a_validation_error() {
        let mut input = valid_input();
        input.service = Some("not-an-object-id".into());
        let errors = input.into_booking(ObjectId::new()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "service");
    }

    #[test]
    fn unparsable_date_is_a_validation_error() {
        let mut input = valid_input();
        input.booking_date = Some("next tuesday".into());
        let errors = input.into_booking(ObjectId::new()).unwrap_err();
        assert_eq!(errors[0].field, "bookingDate");
    }

    #[test]
    fn rfc3339_dates_are_accepted() {
        let mut input = valid_input();
        input.booking_date = Some("2024-05-01T09:30:00Z".into());
        let booking = input.into_booking(ObjectId::new()).unwrap();
        assert_eq!(booking.booking_date.to_rfc3339(), "2024-05-01T09:30:00+00:00");
    }

    #[test]
    fn blank_address_and_zero_amount_are_rejected() {
        let mut input = valid_input();
        input.address = Some("   ".into());
        input.total_amount = Some(0.0);
        let errors = input.into_booking(ObjectId::new()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["address", "totalAmount"]);
    }

    #[test]
    fn update_accepts_any_status_from_the_enum() {
        for status in ["pending", "confirmed", "completed", "cancelled"] {
            let input = BookingInput {
                status: Some(status.into()),
                ..Default::default()
            };
            let set = input.into_update().unwrap();
            assert_eq!(set.get_str("status").unwrap(), status);
        }
    }

    #[test]
    fn update_rejects_unknown_status() {
        let input = BookingInput {
            status: Some("rescheduled".into()),
            ..Default::default()
        };
        let errors = input.into_update().unwrap_err();
        assert_eq!(errors[0].field, "status");
    }

    #[test]
    fn update_cannot_reassign_the_service_reference() {
        let input = BookingInput {
            service: Some(ObjectId::new().to_hex()),
            address: Some("5 Side St".into()),
            ..Default::default()
        };
        let set = input.into_update().unwrap();
        assert!(!set.contains_key("service"));
        assert!(!set.contains_key("user"));
        assert_eq!(set.get_str("address").unwrap(), "5 Side St");
    }

    #[test]
    fn empty_update_is_rejected() {
        let errors = BookingInput::default().into_update().unwrap_err();
        assert_eq!(errors[0].field, "body");
    }
}
