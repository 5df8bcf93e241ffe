use tracing::info;

use cwn_core::types::{Center, SearchCriteria, SelectedSlot};

/// First center/session pair, in server response order, satisfying every
/// configured constraint. No ranking between matches: given two equally
/// eligible centers, the earlier one always wins.
pub fn eligible_session(centers: &[Center], criteria: &SearchCriteria) -> Option<SelectedSlot> {
    for center in centers {
        if !pincode_matches(center.pincode, &criteria.pincodes) {
            continue;
        }
        if !criteria.fee.matches(&center.fee_type) {
            continue;
        }
        for session in &center.sessions {
            if session.capacity_for(criteria.dose) == 0 {
                continue;
            }
            if let Some(vaccine) = &criteria.vaccine
                && session.vaccine != *vaccine
            {
                continue;
            }
            if !criteria.age_tier.matches(session.min_age_limit) {
                continue;
            }
            // Sessions without time slots cannot be committed.
            let Some(slot) = session.slots.first() else {
                continue;
            };
            info!(
                center = %center.name,
                capacity = session.capacity_for(criteria.dose),
                "found availability"
            );
            return Some(SelectedSlot {
                center_id: center.center_id,
                session_id: session.session_id.clone(),
                slot: slot.clone(),
            });
        }
    }
    None
}

fn pincode_matches(pincode: u32, preferred: &[u32]) -> bool {
    preferred.is_empty() || preferred.contains(&pincode)
}
