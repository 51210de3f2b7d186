//! Property tests: outcomes depend only on what each test does, never on
//! what ran before it.

mod common;

use common::*;
use must_assert::host::{Runner, RunnerConfig, TestApi, TestStatus};
use must_assert::{EventLoop, TestFn};
use proptest::prelude::*;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Shape {
    Asserts,
    Empty,
    LeaksTimer,
    AwaitsCounted,
}

impl Shape {
    fn body(self) -> TestFn {
        match self {
            Self::Asserts => TestFn::sync(|cx| cx.expect("zone").to_contain("on")),
            Self::Empty => TestFn::sync(|_| Ok(())),
            Self::LeaksTimer => TestFn::sync(|cx| {
                cx.set_timeout(Duration::from_millis(10), |cx| cx.expect(1).to_be(1));
                Ok(())
            }),
            Self::AwaitsCounted => TestFn::future(|cx| async move {
                cx.assertions(1);
                cx.sleep(Duration::from_millis(20)).await;
                cx.expect(true).to_be_truthy()
            }),
        }
    }

    const fn expected(self) -> TestStatus {
        match self {
            Self::Asserts | Self::AwaitsCounted => TestStatus::Passed,
            Self::Empty | Self::LeaksTimer => TestStatus::Failed,
        }
    }
}

fn shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        Just(Shape::Asserts),
        Just(Shape::Empty),
        Just(Shape::LeaksTimer),
        Just(Shape::AwaitsCounted),
    ]
}

fn run(shapes: &[Shape], fixture: &Fixture, event_loop: &EventLoop) -> Vec<TestStatus> {
    let mut api = fixture.suite("generated");
    for (i, shape) in shapes.iter().enumerate() {
        api.test(&format!("case {i}"), shape.body(), None);
    }
    Runner::new(RunnerConfig::new())
        .run_on(event_loop, api.into_inner())
        .test_results
        .into_iter()
        .map(|r| r.status)
        .collect()
}

proptest! {
    #![proptest_config(test_proptest_config(48))]

    #[test]
    fn status_depends_only_on_the_test(shapes in prop::collection::vec(shape(), 1..12)) {
        init_test_logging();
        let fixture = Fixture::new();
        let event_loop = EventLoop::new();
        let statuses = run(&shapes, &fixture, &event_loop);
        let expected: Vec<_> = shapes.iter().map(|s| s.expected()).collect();
        prop_assert_eq!(&statuses, &expected);

        let leaks = shapes.iter().filter(|s| matches!(s, Shape::LeaksTimer)).count();
        prop_assert_eq!(fixture.warnings().len(), leaks);

        let again = run(&shapes, &fixture, &event_loop);
        prop_assert_eq!(again, statuses);
    }

    #[test]
    fn zone_ids_increase_in_declaration_order(count in 1usize..10) {
        init_test_logging();
        let fixture = Fixture::new();
        let event_loop = EventLoop::new();
        let shapes = vec![Shape::Asserts; count];
        let _ = run(&shapes, &fixture, &event_loop);

        let zones = event_loop.zones();
        prop_assert_eq!(zones.len(), count);
        prop_assert!(zones.windows(2).all(|w| w[0].id() < w[1].id()));
        prop_assert!(zones.iter().all(|z| z.is_finished()));
        prop_assert_eq!(fixture.registry.current(), None);
    }
}
