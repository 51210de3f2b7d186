//! Every test here fails.
//!
//! Each one either makes no assertion on a path the runner observes, or its
//! only assertion runs in work that outlives the test and gets intercepted.

use std::time::Duration;

use crate::cx::Cx;
use crate::enhancer::Enhanced;
use crate::error::{Error, Result};
use crate::host::TestApi;
use crate::wrapper::{Done, TestFn};

/// Name of this suite.
pub const NAME: &str = "failing";

/// Declares the suite on `api`.
pub fn declare<A: TestApi>(api: &mut Enhanced<A>) {
    api.test(
        "unhandled promise rejections fail tests",
        TestFn::future(|cx| async move {
            let _stray = cx.spawn(async { Err::<(), _>(Error::rejected("oops")) });
            cx.sleep(Duration::from_millis(50)).await;
            cx.expect(1).to_be(1)
        }),
        None,
    );

    api.test("no assertions, no code", TestFn::sync(|_| Ok(())), None);

    api.test(
        "synchronous failure",
        TestFn::sync(|cx| cx.expect(true).to_be(false)),
        None,
    );

    declare_shared(api);

    api.test(
        "assertions after done() callback",
        TestFn::callback(assert_after_done),
        None,
    );

    api.test(
        "assertions after done() callback (late timer chain)",
        TestFn::callback(assert_after_done),
        None,
    );

    api.test(
        "assertions failing in setTimeout",
        TestFn::callback(|cx, done| {
            cx.set_timeout(Duration::ZERO, move |cx| {
                cx.expect(true).to_be(false)?;
                done.call();
                Ok(())
            });
            Ok(())
        }),
        None,
    );

    api.describe("it() blocks work as test()", |api| {
        api.it(
            "synchronous failure",
            TestFn::sync(|cx| cx.expect(true).to_be(false)),
            None,
        );
        declare_shared(api);
    });
}

/// Tests declared both at the top level and inside the `it()` group.
fn declare_shared<A: TestApi>(api: &mut Enhanced<A>) {
    api.it(
        "missed runtime assertion",
        TestFn::sync(|cx| {
            let cx = cx.clone();
            let _unused = move || cx.expect(true).to_be(true);
            Ok(())
        }),
        None,
    );

    api.it(
        "missed rejected promise",
        TestFn::future(|cx| async move {
            cx.reject::<()>(Error::rejected("rejected")).await?;
            cx.expect(true).to_be(true)
        }),
        None,
    );

    api.it(
        "unreturned promise assertions",
        TestFn::sync(|cx| {
            let c = cx.clone();
            let _unreturned = cx.spawn(async move { c.expect(true).to_be(true) });
            Ok(())
        }),
        None,
    );

    api.it(
        "assertions in missed macro-tasks",
        TestFn::sync(|cx| {
            cx.set_timeout(Duration::from_millis(100), |cx| cx.expect(1 + 1).to_be(2));
            Ok(())
        }),
        None,
    );
}

fn assert_after_done(cx: &Cx, done: Done) -> Result<()> {
    cx.set_timeout(Duration::ZERO, move |cx| {
        done.call();
        cx.set_timeout(Duration::ZERO, |cx| cx.expect(1 + 1).to_be(2));
        Ok(())
    });
    Ok(())
}
