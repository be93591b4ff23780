//! Property tests: phase progression is monotonic under any call order.

use std::rc::Rc;
use std::time::Duration;

use proptest::prelude::*;

use fuselight::scheduler::{ManualScheduler, SchedulerRecord};
use fuselight::sequencer::{AnimationSequencer, Phase};

#[derive(Debug, Clone)]
enum Op {
    Fall,
    Swing,
    Timeout,
    Advance(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Fall),
        Just(Op::Swing),
        Just(Op::Timeout),
        (0_u64..6000).prop_map(Op::Advance),
    ]
}

proptest! {
    #[test]
    fn phase_never_regresses(ops in prop::collection::vec(op(), 0..40)) {
        let scheduler = Rc::new(ManualScheduler::new());
        let mut sequencer = AnimationSequencer::with_defaults(Rc::clone(&scheduler));
        let mut last = sequencer.phase();

        for op in ops {
            match op {
                Op::Fall => { sequencer.on_fall_complete(); }
                Op::Swing => { sequencer.on_swing_complete(); }
                Op::Timeout => { sequencer.on_flicker_timeout(); }
                Op::Advance(n) => { scheduler.advance(Duration::from_millis(n)); }
            }

            let state = sequencer.state();
            prop_assert!(state.phase >= last, "{:?} regressed to {:?}", last, state.phase);
            prop_assert!(state.is_consistent(), "inconsistent {:?}", state);
            if last == Phase::Steady {
                prop_assert_eq!(state.phase, Phase::Steady);
            }
            last = state.phase;
        }

        // At most one flicker timer was ever armed.
        let scheduled = scheduler
            .records()
            .iter()
            .filter(|r| matches!(r, SchedulerRecord::Scheduled { .. }))
            .count();
        prop_assert!(scheduled <= 1);
    }

    #[test]
    fn both_settling_orders_reach_steady(swing_at in 0_u64..8000) {
        let scheduler = Rc::new(ManualScheduler::new());
        let mut sequencer = AnimationSequencer::with_defaults(Rc::clone(&scheduler));
        sequencer.on_fall_complete();
        scheduler.advance(Duration::from_millis(swing_at));
        sequencer.on_swing_complete();
        scheduler.advance(Duration::from_millis(8000));
        prop_assert_eq!(sequencer.phase(), Phase::Steady);
        prop_assert!(!sequencer.state().flicker_active);
    }
}
