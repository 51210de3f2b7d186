//! Every executed test here passes: assertions happen on paths the test
//! awaits or completes through.

use serde_json::{json, Value};
use std::time::Duration;

use crate::cx::Cx;
use crate::enhancer::Enhanced;
use crate::error::{Error, Result};
use crate::host::{each_body, TestApi};
use crate::runtime::Promise;
use crate::wrapper::{Done, TestFn};

/// Name of this suite.
pub const NAME: &str = "passing";

fn get_promise(cx: &Cx) -> Promise<Value> {
    cx.resolve(json!({}))
}

/// Declares the suite on `api`.
pub fn declare<A: TestApi>(api: &mut Enhanced<A>) {
    declare_shared(api);

    api.describe("it() should behave the same as test()", |api| {
        declare_shared(api);
    });

    api.test(
        "explicit assertion counts are respected",
        TestFn::future(|cx| async move {
            cx.assertions(2);
            let started = cx.now();
            cx.sleep(Duration::from_millis(10)).await;
            cx.expect(cx.now().duration_since(started)).to_be(10)?;
            cx.expect("zone").to_contain("one")
        }),
        None,
    );

    api.test(
        "explicit zero assertions are respected",
        TestFn::sync(|cx| {
            cx.assertions(0);
            Ok(())
        }),
        None,
    );

    api.each(
        vec![vec![json!(1), json!(2), json!(3)], vec![json!(2), json!(2), json!(4)]],
        "each rows pass through: %i + %i = %i",
        each_body(|cx, row| {
            let sum: i64 = row[..2].iter().filter_map(Value::as_i64).sum();
            cx.expect(Some(sum)).to_be(row[2].as_i64())
        }),
        None,
    );

    api.skip(
        "skipped tests never run",
        TestFn::sync(|_| Err(Error::user("skipped body ran"))),
        None,
    );

    api.todo("todo tests are reported, not run");
}

fn declare_shared<A: TestApi>(api: &mut Enhanced<A>) {
    api.it(
        "basic tests should pass",
        TestFn::sync(|cx| cx.expect(1 + 2).to_be(3)),
        None,
    );

    api.it(
        "async tests should pass",
        TestFn::future(|cx| async move {
            let result = get_promise(&cx).await?;
            cx.expect(result.is_null()).to_be(false)
        }),
        None,
    );

    api.it(
        "promise tests should pass",
        TestFn::future(|cx| async move {
            let c = cx.clone();
            let chained = cx.spawn(async move {
                c.expect(1 + 1).to_be(2)?;
                Err::<(), _>(Error::user("thrown after asserting"))
            });
            match chained.await {
                Ok(()) => Ok(()),
                Err(_) => cx.expect(1 + 2).to_be(3),
            }
        }),
        None,
    );

    api.it(
        "done callback tests should pass",
        TestFn::callback(assert_then_done),
        None,
    );
}

fn assert_then_done(cx: &Cx, done: Done) -> Result<()> {
    let c = cx.clone();
    let _continuation = cx.spawn(async move {
        c.expect(1 + 1).to_be(2)?;
        done.call();
        Ok(())
    });
    Ok(())
}
