mod cancel;

pub use cancel::{CancelToken, RequestTracker};

use crate::error::{RemoteError, RemoteResult};
use futures::future::{select, Either, LocalBoxFuture};
use futures::FutureExt;
use std::future::Future;
use std::time::Duration;

/// Time source for backoff sleeps and deadlines.
pub trait Clock {
    /// Monotonic-enough reading; only differences are used.
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// `Date.now()` + `setTimeout`, for the browser event loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now(&self) -> Duration {
        Duration::from_millis(js_sys::Date::now().max(0.0) as u64)
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let ms = duration.as_millis().min(i32::MAX as u128) as i32;
        let mut handle = None;
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            handle = web_sys::window().and_then(|w| {
                w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                    .ok()
            });
            if handle.is_none() {
                let _ = resolve.call0(&wasm_bindgen::JsValue::NULL);
            }
        });
        let timer = PendingTimeout(handle);
        async move {
            let _timer = timer;
            let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
        }
        .boxed_local()
    }
}

/// Clears its `setTimeout` when dropped. A deadline race loses its sleep as
/// soon as the attempt finishes, and the timer would otherwise stay queued.
struct PendingTimeout(Option<i32>);

impl Drop for PendingTimeout {
    fn drop(&mut self) {
        if let (Some(handle), Some(w)) = (self.0.take(), web_sys::window()) {
            w.clear_timeout_with_handle(handle);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: u32,
    /// Overall budget for all attempts and sleeps. `None` disables it.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_factor: 2,
            deadline: Some(Duration::from_secs(60)),
        }
    }
}

impl RetryPolicy {
    /// Sum of every backoff sleep when all retries are used.
    pub fn worst_case_backoff(&self) -> Duration {
        let mut total = Duration::ZERO;
        let mut delay = self.initial_delay;
        for _ in 0..self.max_retries {
            total += delay;
            delay = delay.saturating_mul(self.backoff_factor);
        }
        total
    }
}

/// Runs an outbound call with bounded exponential backoff.
///
/// Transient failures (429, transport errors) are retried; anything else is
/// returned after a single attempt.
#[derive(Clone, Debug)]
pub struct ResilientCaller<C> {
    clock: C,
    policy: RetryPolicy,
}

impl<C: Clock> ResilientCaller<C> {
    pub fn new(clock: C, policy: RetryPolicy) -> Self {
        Self { clock, policy }
    }

    fn remaining(&self, started: Duration) -> Option<Duration> {
        let elapsed = self.clock.now().saturating_sub(started);
        self.policy.deadline.map(|d| d.saturating_sub(elapsed))
    }

    pub async fn call<T, F, Fut>(&self, cancel: &CancelToken, mut op: F) -> RemoteResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let started = self.clock.now();
        let deadline = self.policy.deadline.unwrap_or_default();
        let mut delay = self.policy.initial_delay;
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RemoteError::Cancelled);
            }
            attempt += 1;

            let outcome = match self.remaining(started) {
                Some(remaining) if remaining.is_zero() => {
                    return Err(RemoteError::DeadlineExceeded(deadline));
                }
                Some(remaining) => {
                    match select(Box::pin(op()), self.clock.sleep(remaining)).await {
                        Either::Left((result, _)) => result,
                        Either::Right(_) => {
                            log::warn!("attempt {attempt} still pending at deadline");
                            return Err(RemoteError::DeadlineExceeded(deadline));
                        }
                    }
                }
                None => op().await,
            };

            // A result for a superseded request is dropped, success included.
            if cancel.is_cancelled() {
                return Err(RemoteError::Cancelled);
            }

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt <= self.policy.max_retries => {
                    if let Some(remaining) = self.remaining(started) {
                        if delay >= remaining {
                            log::warn!("attempt {attempt} failed ({e}); no time left to retry");
                            return Err(RemoteError::DeadlineExceeded(deadline));
                        }
                    }
                    log::warn!("attempt {attempt} failed ({e}); retrying in {delay:?}");
                    self.clock.sleep(delay).await;
                    delay = delay.saturating_mul(self.policy.backoff_factor);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for ResilientCaller<BrowserClock> {
    fn default() -> Self {
        Self::new(BrowserClock, RetryPolicy::default())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Sleeps complete immediately and advance a virtual clock.
    #[derive(Clone, Debug, Default)]
    pub(crate) struct ManualClock {
        now: Rc<Cell<Duration>>,
        sleeps: Rc<RefCell<Vec<Duration>>>,
    }

    impl ManualClock {
        pub(crate) fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.borrow().clone()
        }

        pub(crate) fn elapsed(&self) -> Duration {
            self.now.get()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            self.now.get()
        }

        fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
            let now = Rc::clone(&self.now);
            let sleeps = Rc::clone(&self.sleeps);
            async move {
                now.set(now.get() + duration);
                sleeps.borrow_mut().push(duration);
            }
            .boxed_local()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;
    use futures::executor::block_on;
    use std::cell::Cell;

    fn caller(clock: &ManualClock) -> ResilientCaller<ManualClock> {
        ResilientCaller::new(clock.clone(), RetryPolicy::default())
    }

    fn permanent(status: u16) -> RemoteError {
        RemoteError::Permanent {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn test_rate_limited_twice_then_success() {
        let clock = ManualClock::default();
        let attempts = Cell::new(0);

        let result = block_on(caller(&clock).call(&CancelToken::never(), || {
            attempts.set(attempts.get() + 1);
            let n = attempts.get();
            async move {
                if n < 3 {
                    Err(RemoteError::rate_limited("quota"))
                } else {
                    Ok("done")
                }
            }
        }));

        assert_eq!(result, Ok("done"));
        assert_eq!(attempts.get(), 3);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
        assert_eq!(clock.elapsed(), Duration::from_millis(3000));
    }

    #[test]
    fn test_permanent_failure_is_not_retried() {
        let clock = ManualClock::default();
        let attempts = Cell::new(0);

        let result: RemoteResult<()> = block_on(caller(&clock).call(&CancelToken::never(), || {
            attempts.set(attempts.get() + 1);
            async { Err(permanent(403)) }
        }));

        assert_eq!(result, Err(permanent(403)));
        assert_eq!(attempts.get(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_exhausted_retries_return_last_transient_error() {
        let clock = ManualClock::default();
        let attempts = Cell::new(0);

        let result: RemoteResult<()> = block_on(caller(&clock).call(&CancelToken::never(), || {
            attempts.set(attempts.get() + 1);
            let n = attempts.get();
            async move { Err(RemoteError::transport(format!("reset #{n}"))) }
        }));

        assert_eq!(result, Err(RemoteError::transport("reset #4")));
        assert_eq!(attempts.get(), 4);
        assert_eq!(clock.elapsed(), RetryPolicy::default().worst_case_backoff());
        assert_eq!(clock.elapsed(), Duration::from_millis(7000));
    }

    #[test]
    fn test_cancelled_request_discards_result() {
        let clock = ManualClock::default();
        let tracker = RequestTracker::new();
        let token = tracker.begin();
        let attempts = Cell::new(0);

        let result = block_on(caller(&clock).call(&token, || {
            attempts.set(attempts.get() + 1);
            // The user starts a newer request while this one is in flight.
            tracker.begin();
            async { Ok(1) }
        }));

        assert_eq!(result, Err(RemoteError::Cancelled));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_cancelled_before_first_attempt() {
        let clock = ManualClock::default();
        let tracker = RequestTracker::new();
        let token = tracker.begin();
        tracker.cancel();
        let attempts = Cell::new(0);

        let result = block_on(caller(&clock).call(&token, || {
            attempts.set(attempts.get() + 1);
            async { Ok(()) }
        }));

        assert_eq!(result, Err(RemoteError::Cancelled));
        assert_eq!(attempts.get(), 0);
    }

    #[test]
    fn test_deadline_stops_backoff() {
        let clock = ManualClock::default();
        let policy = RetryPolicy {
            deadline: Some(Duration::from_millis(2500)),
            ..RetryPolicy::default()
        };
        let attempts = Cell::new(0);

        let result: RemoteResult<()> = block_on(ResilientCaller::new(clock.clone(), policy).call(
            &CancelToken::never(),
            || {
                attempts.set(attempts.get() + 1);
                async { Err(RemoteError::rate_limited("")) }
            },
        ));

        assert_eq!(
            result,
            Err(RemoteError::DeadlineExceeded(Duration::from_millis(2500)))
        );
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn test_hung_attempt_times_out() {
        let clock = ManualClock::default();
        let result: RemoteResult<()> = block_on(
            caller(&clock).call(&CancelToken::never(), futures::future::pending::<RemoteResult<()>>),
        );
        assert_eq!(
            result,
            Err(RemoteError::DeadlineExceeded(Duration::from_secs(60)))
        );
    }

    #[test]
    fn test_no_deadline_calls_directly() {
        let clock = ManualClock::default();
        let policy = RetryPolicy {
            deadline: None,
            max_retries: 1,
            ..RetryPolicy::default()
        };
        let result = block_on(
            ResilientCaller::new(clock.clone(), policy)
                .call(&CancelToken::never(), || async { Ok::<_, RemoteError>(7) }),
        );
        assert_eq!(result, Ok(7));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    async fn test_dropped_timeout_never_fires() {
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let cb = Closure::once_into_js(move || flag.set(true));
        let handle = web_sys::window()
            .unwrap()
            .set_timeout_with_callback_and_timeout_and_arguments_0(cb.unchecked_ref(), 5)
            .unwrap();

        drop(PendingTimeout(Some(handle)));
        BrowserClock.sleep(Duration::from_millis(30)).await;
        assert!(!fired.get());
    }

    #[wasm_bindgen_test]
    async fn test_short_sleep_wins_deadline_race() {
        let clock = BrowserClock;
        let race = select(
            clock.sleep(Duration::from_millis(5)),
            clock.sleep(Duration::from_secs(60)),
        )
        .await;
        assert!(matches!(race, Either::Left(_)));
    }
}
