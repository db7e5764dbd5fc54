//! Voucher pricing rules shared by the HTTP client and the mock.

use super::models::{DiscountType, VoucherDto, VoucherQuote};
use super::{ApiError, ApiFuture, VoucherService};
use crate::types::Money;
use chrono::{DateTime, NaiveDate};

/// Prices `code` against the voucher catalogue
///
/// Codes match case-insensitively. A voucher is rejected when switched off,
/// expired before `today`, used up, or when `subtotal` is below its minimum
/// order value. The discount never exceeds `subtotal`.
///
/// # Errors
///
/// Returns an invalid-voucher [`ApiError`] carrying a guest-facing reason.
pub fn quote(vouchers: &[VoucherDto], code: &str, subtotal: Money, today: NaiveDate) -> Result<VoucherQuote, ApiError> {
    let code = code.trim();
    let voucher = vouchers
        .iter()
        .find(|v| v.code.eq_ignore_ascii_case(code))
        .ok_or_else(|| ApiError::invalid_voucher("Mã voucher không tồn tại."))?;

    if !voucher.active {
        return Err(ApiError::invalid_voucher("Mã voucher đã ngừng áp dụng."));
    }
    if voucher
        .expiry_date
        .as_deref()
        .and_then(parse_day)
        .is_some_and(|expiry| expiry < today)
    {
        return Err(ApiError::invalid_voucher("Mã voucher đã hết hạn."));
    }
    if voucher.max_uses.is_some_and(|max| max > 0 && voucher.current_uses >= max) {
        return Err(ApiError::invalid_voucher("Mã voucher đã hết lượt sử dụng."));
    }
    if subtotal < voucher.min_order_value {
        return Err(ApiError::invalid_voucher(format!(
            "Đơn hàng tối thiểu {} để dùng mã này.",
            voucher.min_order_value
        )));
    }

    let discount = match voucher.discount_type {
        DiscountType::Percentage => subtotal.percent(voucher.value.dong().min(100)),
        DiscountType::Fixed => voucher.value,
    };

    Ok(VoucherQuote {
        code: voucher.code.clone(),
        discount: discount.min(subtotal),
    })
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw.trim()).ok().map(|dt| dt.date_naive()))
}

/// Built-in promotional codes, used when no voucher backend is configured
///
/// `MAISON20` takes 20% off the subtotal.
#[derive(Clone, Debug)]
pub struct PromoCodeVouchers {
    catalogue: Vec<VoucherDto>,
}

impl PromoCodeVouchers {
    /// The built-in catalogue
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalogue: vec![VoucherDto {
                code: "MAISON20".to_string(),
                discount_type: DiscountType::Percentage,
                value: Money::from_dong(20),
                expiry_date: None,
                max_uses: None,
                current_uses: 0,
                min_order_value: Money::ZERO,
                active: true,
            }],
        }
    }
}

impl Default for PromoCodeVouchers {
    fn default() -> Self {
        Self::new()
    }
}

impl VoucherService for PromoCodeVouchers {
    fn validate(&self, code: &str, subtotal: Money, today: NaiveDate) -> ApiFuture<VoucherQuote> {
        let result = quote(&self.catalogue, code, subtotal, today);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::ApiErrorKind;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixed(code: &str, value: u64) -> VoucherDto {
        VoucherDto {
            code: code.to_string(),
            discount_type: DiscountType::Fixed,
            value: Money::from_dong(value),
            expiry_date: None,
            max_uses: None,
            current_uses: 0,
            min_order_value: Money::ZERO,
            active: true,
        }
    }

    #[test]
    fn percentage_applies_to_subtotal() {
        let promo = PromoCodeVouchers::new();
        let quote = quote(&promo.catalogue, "maison20", Money::from_dong(500_000), day(2025, 1, 1)).unwrap();
        assert_eq!(quote.code, "MAISON20");
        assert_eq!(quote.discount, Money::from_dong(100_000));
    }

    #[test]
    fn offline_catalogue_serves_the_promo_code() {
        let promo = PromoCodeVouchers::default();
        let quote = tokio_test::block_on(promo.validate(" Maison20 ", Money::from_dong(1_000_000), day(2025, 1, 1)));
        assert_eq!(quote.unwrap().discount, Money::from_dong(200_000));

        let missing = tokio_test::block_on(promo.validate("TET", Money::from_dong(1_000_000), day(2025, 1, 1)));
        assert_eq!(missing.unwrap_err().kind, ApiErrorKind::InvalidVoucher);
    }

    #[test]
    fn fixed_discount_is_capped_at_subtotal() {
        let vouchers = [fixed("GIAM1TR", 1_000_000)];
        let quote = quote(&vouchers, "GIAM1TR", Money::from_dong(300_000), day(2025, 1, 1)).unwrap();
        assert_eq!(quote.discount, Money::from_dong(300_000));
    }

    #[test]
    fn rejects_unknown_expired_exhausted_and_small_orders() {
        let today = day(2025, 6, 1);
        let mut expired = fixed("OLD", 10_000);
        expired.expiry_date = Some("2025-05-31".into());
        let mut exhausted = fixed("GONE", 10_000);
        exhausted.max_uses = Some(5);
        exhausted.current_uses = 5;
        let mut minimum = fixed("BIG", 10_000);
        minimum.min_order_value = Money::from_dong(1_000_000);
        let mut off = fixed("OFF", 10_000);
        off.active = false;
        let vouchers = [expired, exhausted, minimum, off];

        for code in ["NOPE", "OLD", "GONE", "BIG", "OFF"] {
            let error = quote(&vouchers, code, Money::from_dong(200_000), today).unwrap_err();
            assert_eq!(error.kind, ApiErrorKind::InvalidVoucher, "{code}");
        }
    }

    #[test]
    fn expiry_day_itself_is_still_valid() {
        let mut voucher = fixed("LASTDAY", 10_000);
        voucher.expiry_date = Some("2025-06-01T23:59:59Z".into());
        assert!(quote(&[voucher], "LASTDAY", Money::from_dong(50_000), day(2025, 6, 1)).is_ok());
    }
}
