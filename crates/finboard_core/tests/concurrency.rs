use chrono::NaiveDate;
use finboard_core::{
    AmountMode, BackgroundWorker, Clock, Deadline, FinanceStore, FixedClock, HistoryRecorder,
    LedgerService, LedgerUpdateRequest, RawAmount, ResetService,
};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;
const UPDATES_PER_THREAD: usize = 25;
const AMOUNT: i64 = 7;

fn monday_noon() -> Arc<FixedClock> {
    // 2024-03-04 was a Monday.
    let now = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    Arc::new(FixedClock::at(now))
}

fn income(value: i64) -> LedgerUpdateRequest {
    LedgerUpdateRequest {
        kind: "income".to_string(),
        value: RawAmount::from(value),
        is_incremental: true,
    }
}

#[test]
fn concurrent_income_updates_are_never_lost() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FinanceStore::open(dir.path().join("finboard.db")).unwrap());
    let clock: Arc<dyn Clock> = monday_noon();
    let worker = BackgroundWorker::start().unwrap();
    let service = Arc::new(LedgerService::new(
        Arc::clone(&store),
        clock,
        AmountMode::Integer,
        HistoryRecorder::background(Arc::clone(&store), worker.handle()),
    ));

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..UPDATES_PER_THREAD {
                    service
                        .update(&income(AMOUNT), Deadline::after(Duration::from_secs(30)))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let expected = (THREADS * UPDATES_PER_THREAD) as i64 * AMOUNT;
    let state = service.dashboard(Deadline::none()).unwrap();
    assert_eq!(state.ledger.income, expected);
    assert_eq!(state.buckets.monthly.income[2], expected);
    assert_eq!(state.buckets.weekly.earning[0], expected);

    let stats = worker.shutdown();
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.completed, (THREADS * UPDATES_PER_THREAD) as u64);
    let history = service.history(1_000, Deadline::none()).unwrap();
    assert_eq!(history.len(), 100);
}

#[test]
fn weekly_reset_racing_updates_keeps_totals_consistent() {
    let store = Arc::new(FinanceStore::open_in_memory().unwrap());
    let clock = monday_noon();
    let service = Arc::new(LedgerService::new(
        Arc::clone(&store),
        Arc::clone(&clock) as Arc<dyn Clock>,
        AmountMode::Integer,
        HistoryRecorder::inline(Arc::clone(&store)),
    ));
    let reset = Arc::new(ResetService::new(
        Arc::clone(&store),
        clock as Arc<dyn Clock>,
        AmountMode::Integer,
    ));

    let updater = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            for _ in 0..50 {
                service.update(&income(3), Deadline::none()).unwrap();
            }
        })
    };
    let resetter = {
        let reset = Arc::clone(&reset);
        thread::spawn(move || {
            for _ in 0..10 {
                reset.weekly_reset(Deadline::none()).unwrap();
            }
        })
    };
    updater.join().unwrap();
    resetter.join().unwrap();

    // Every unit of income is either still pending in `income` or was folded
    // into savings by a reset; none disappears.
    let state = service.dashboard(Deadline::none()).unwrap();
    assert_eq!(state.ledger.savings + state.ledger.income, 150);
    assert_eq!(state.buckets.monthly.income[2], 150);
    assert_eq!(state.buckets.weekly.earning[0], state.ledger.income);
}
