use serde_json::json;
use tracing::{info, warn};

use super::AccountHandle;
use crate::api::types::CouponPage;
use crate::api::{ApiCall, ApiTransport, Gateway};
use crate::notify::Notifier;

// `status` filter value for coupons that have not been redeemed.
const STATUS_UNUSED: u8 = 1;

/// Names of unused coupons, in the order the platform lists them. Any failure
/// or odd payload yields an empty list: having no coupons is normal.
pub async fn list_unused<T: ApiTransport, N: Notifier>(
    gateway: &Gateway<'_, T, N>,
    handle: &AccountHandle,
    page_size: u32,
) -> Vec<String> {
    let call = ApiCall::post(
        "member/getCopuonsPageList",
        json!({
            "pageSize": page_size,
            "pageNumber": 1,
            "totalPages": "",
            "memberId": handle.member_id,
            "businessType": "",
            "status": STATUS_UNUSED,
        }),
    );

    let page = match gateway.execute::<CouponPage>("list coupons", call).await {
        Ok(Some(reply)) if reply.is_success() => reply.data,
        Ok(_) => {
            warn!(account = gateway.account(), "coupon query rejected or empty");
            None
        }
        Err(err) => {
            warn!(account = gateway.account(), error = %err, "coupon query failed");
            None
        }
    };

    let names: Vec<String> = page
        .and_then(|p| p.items)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| item.name)
        .filter(|name| !name.trim().is_empty())
        .collect();
    info!(account = gateway.account(), count = names.len(), "unused coupons listed");
    names
}
