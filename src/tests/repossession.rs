//! Repossession end-to-end through `Core::handle_request` (spec.md §4.5
//! "3 consecutive missed payments" / §8 scenario 3), as opposed to
//! `ledger.rs`'s own inline coverage of the same rule directly against
//! `FinanceLedger`.

use used_equipment_core::request::RequestKind;
use used_equipment_core::{Core, CoreConfig, DealKind, Money, Request, StubHost};

const MONTH_MS: i64 = 30 * 24 * 60 * 60 * 1000;

#[test]
fn three_consecutive_skipped_months_repossesses_and_dings_credit() {
    let mut core = Core::new(CoreConfig::default(), 7);
    let mut host = StubHost::new().with_farm(1, Money::from_major(200_000));

    let open = core.handle_request(
        &mut host,
        Request {
            farm_id: 1,
            kind: RequestKind::TakeLoan { amount: Money::from_major(10_000), term_months: 24, kind: DealKind::CashLoan },
        },
    );
    assert!(open.success, "{open:?}");
    let deal_id = core.deals_for_farm(1)[0].id.clone();

    let skip = core.handle_request(
        &mut host,
        Request {
            farm_id: 1,
            kind: RequestKind::SetPaymentConfig {
                deal_id: deal_id.clone(),
                mode: used_equipment_core::deal::PaymentMode::Skip,
                custom_amount: None,
                multiplier: 1.0,
            },
        },
    );
    assert!(skip.success, "{skip:?}");

    let score_before = core.credit_score(1);

    for month in 0..3 {
        host.now = month * MONTH_MS;
        core.month_tick(&host);
    }

    let deal = core.deal(&deal_id).unwrap();
    assert_eq!(deal.status, used_equipment_core::DealStatus::Defaulted);
    assert_eq!(deal.consecutive_missed_payments, 3);
    // Three `PaymentMissed` events (-25 each) must have landed.
    assert!(core.credit_score(1) <= score_before - 75);
}
