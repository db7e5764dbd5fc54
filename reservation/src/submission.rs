//! Turning a finished draft into a reservation request, and a created
//! reservation into the summary shown on the success screen.

use crate::api::{CreateReservationRequest, CreateReservationResponse, PreOrderLine, ReservationPreferences};
use crate::types::{Money, ReservationDraft};
use chrono::{FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

/// Why a draft cannot be sent
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// No table selected
    #[error("no table selected")]
    MissingTable,
    /// Date or time missing
    #[error("reservation date or time missing")]
    MissingSchedule,
    /// Time is not `HH:MM`
    #[error("invalid reservation time {0:?}")]
    InvalidTime(String),
}

impl SubmissionError {
    /// Plain-language Vietnamese message for notifications
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::MissingTable => "Vui lòng chọn bàn trước khi đặt.",
            Self::MissingSchedule | Self::InvalidTime(_) => "Vui lòng chọn ngày và giờ hợp lệ.",
        }
    }
}

/// Local date and `HH:MM` at `offset`, as a UTC RFC 3339 timestamp with milliseconds
///
/// # Errors
///
/// [`SubmissionError::InvalidTime`] when `time` is not `HH:MM`.
pub fn reservation_time(date: NaiveDate, time: &str, offset: FixedOffset) -> Result<String, SubmissionError> {
    let invalid = || SubmissionError::InvalidTime(time.to_string());
    let time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| invalid())?;
    let local = offset.from_local_datetime(&date.and_time(time)).single().ok_or_else(invalid)?;
    Ok(local.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Builds the creation request from the whole draft
///
/// # Errors
///
/// A [`SubmissionError`] when the table, date or time is missing or malformed.
pub fn build_request(
    draft: &ReservationDraft,
    offset: FixedOffset,
) -> Result<CreateReservationRequest, SubmissionError> {
    let table_id = draft.selected_table_id.clone().ok_or(SubmissionError::MissingTable)?;
    let date = draft.date.ok_or(SubmissionError::MissingSchedule)?;
    if draft.time.is_empty() {
        return Err(SubmissionError::MissingSchedule);
    }

    let pre_order_items: Vec<PreOrderLine> = draft
        .pre_orders
        .iter()
        .map(|item| PreOrderLine {
            dish_id: item.dish_id.clone(),
            quantity: item.quantity.get(),
        })
        .collect();
    let special_requests = draft.special_requests.trim();

    Ok(CreateReservationRequest {
        table_id,
        reservation_time: reservation_time(date, &draft.time, offset)?,
        duration_minutes: draft.duration_minutes.get(),
        num_people: draft.num_people,
        preferences: ReservationPreferences {
            customer_name: draft.customer_name.trim().to_string(),
            customer_phone: draft.customer_phone.trim().to_string(),
            customer_email: draft.customer_email.trim().to_string(),
            special_requests: (!special_requests.is_empty()).then(|| special_requests.to_string()),
            event_details: draft.event_details.clone(),
            selected_services: draft.selected_services.clone(),
        },
        event_id: draft.event_id.clone(),
        pre_order_items: (!pre_order_items.is_empty()).then_some(pre_order_items),
    })
}

/// What the success screen shows after the draft is gone
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfirmedReservation {
    /// Reservation id from the backend
    pub id: String,
    /// Backend status, if reported
    pub status: Option<String>,
    /// Table number
    pub table_name: Option<String>,
    /// Date
    pub date: Option<NaiveDate>,
    /// Time, `HH:MM`
    pub time: String,
    /// Party size
    pub num_people: u32,
    /// Deposit reported by the backend, else the one priced locally
    pub deposit: Money,
    /// Payment was required but no payment link came back
    pub payment_pending: bool,
}

impl ConfirmedReservation {
    /// Snapshot of `draft` as confirmed by `response`
    #[must_use]
    pub fn new(response: &CreateReservationResponse, draft: &ReservationDraft) -> Self {
        Self {
            id: response.reservation.id.clone(),
            status: response.reservation.status.clone(),
            table_name: draft.selected_table_name.clone(),
            date: draft.date,
            time: draft.time.clone(),
            num_people: draft.num_people,
            deposit: response.deposit_amount.unwrap_or(draft.deposit_amount),
            payment_pending: response.requires_payment,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::steps::preorder::add_dish;
    use crate::types::DurationMinutes;

    fn vietnam() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn draft() -> ReservationDraft {
        ReservationDraft {
            customer_name: " Nguyễn Văn An ".into(),
            customer_phone: "0901234567".into(),
            num_people: 4,
            duration_minutes: DurationMinutes::clamped(60),
            date: NaiveDate::from_ymd_opt(2025, 1, 2),
            time: "19:00".into(),
            selected_table_id: Some("t-12".into()),
            selected_table_name: Some("12".into()),
            ..ReservationDraft::default()
        }
    }

    #[test]
    fn local_evening_is_sent_as_utc() {
        let time = reservation_time(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(), "19:00", vietnam()).unwrap();
        assert_eq!(time, "2025-01-02T12:00:00.000Z");

        let early = reservation_time(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(), "06:30", vietnam()).unwrap();
        assert_eq!(early, "2025-01-01T23:30:00.000Z");
    }

    #[test]
    fn optional_parts_are_omitted() {
        let request = build_request(&draft(), vietnam()).unwrap();
        assert_eq!(request.preferences.customer_name, "Nguyễn Văn An");
        assert_eq!(request.duration_minutes, 60);

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("event_id").is_none());
        assert!(json.get("pre_order_items").is_none());
        assert!(json["preferences"].get("special_requests").is_none());
    }

    #[test]
    fn dishes_become_id_quantity_pairs() {
        let mut draft = draft();
        let items = add_dish(&[], "pho-bo".into(), "Phở bò".into(), Money::from_dong(85_000));
        draft.pre_orders = add_dish(&items, "pho-bo".into(), "Phở bò".into(), Money::from_dong(85_000));
        draft.event_id = Some("evt-birthday".into());
        draft.selected_services = vec!["Bánh kem".into()];

        let request = build_request(&draft, vietnam()).unwrap();
        assert_eq!(
            request.pre_order_items,
            Some(vec![PreOrderLine {
                dish_id: "pho-bo".into(),
                quantity: 2,
            }])
        );
        assert_eq!(request.event_id.as_deref(), Some("evt-birthday"));
        assert_eq!(request.preferences.selected_services, vec!["Bánh kem"]);
    }

    #[test]
    fn incomplete_drafts_are_refused() {
        let mut no_table = draft();
        no_table.selected_table_id = None;
        assert_eq!(build_request(&no_table, vietnam()), Err(SubmissionError::MissingTable));

        let mut no_time = draft();
        no_time.time.clear();
        assert_eq!(build_request(&no_time, vietnam()), Err(SubmissionError::MissingSchedule));

        let mut bad_time = draft();
        bad_time.time = "7pm".into();
        assert!(matches!(build_request(&bad_time, vietnam()), Err(SubmissionError::InvalidTime(_))));
    }
}
