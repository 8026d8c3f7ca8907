//! Per-thread delivery of settlement observers.
//!
//! Settling a promise from inside an observer would otherwise recurse once per
//! chained link. The outermost settlement on a thread drains a FIFO of
//! observer jobs; settlements made while that drain runs only append to it.

use std::{cell::RefCell, collections::VecDeque};

pub(crate) type Job = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<Option<VecDeque<Job>>> = const { RefCell::new(None) };
}

/// Runs `jobs` in order, along with every job they cause to be delivered,
/// before returning. If a drain is already running on this thread the jobs
/// are queued behind it instead.
pub(crate) fn deliver<I>(jobs: I)
where
    I: IntoIterator<Item = Job>,
{
    let nested = QUEUE.with(move |queue| {
        let mut queue = queue.borrow_mut();
        match queue.as_mut() {
            Some(pending) => {
                pending.extend(jobs);
                true
            }
            None => {
                *queue = Some(jobs.into_iter().collect());
                false
            }
        }
    });
    if nested {
        return;
    }

    let _drain = Drain;
    while let Some(job) = QUEUE.with(|queue| queue.borrow_mut().as_mut().and_then(VecDeque::pop_front)) {
        job();
    }
}

/// Closes the drain, even when a job panics.
struct Drain;

impl Drop for Drain {
    fn drop(&mut self) {
        let leftover = QUEUE.try_with(|queue| queue.borrow_mut().take());
        drop(leftover);
    }
}

#[cfg(test)]
mod tests {
    use super::{deliver, Job};
    use std::{cell::RefCell, panic, rc::Rc};

    #[test]
    fn test_deliver_runs_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let jobs: Vec<Job> = (0..3)
            .map(|n| {
                let seen = seen.clone();
                Box::new(move || seen.borrow_mut().push(n)) as Job
            })
            .collect();
        deliver(jobs);
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_nested_delivery_is_queued() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let outer = seen.clone();
        let inner = seen.clone();
        deliver(vec![
            Box::new(move || {
                let nested = inner.clone();
                deliver(vec![Box::new(move || nested.borrow_mut().push("nested")) as Job]);
                // Not run yet: the outer drain owns the queue.
                inner.borrow_mut().push("first");
            }) as Job,
            Box::new(move || outer.borrow_mut().push("second")) as Job,
        ]);
        assert_eq!(*seen.borrow(), vec!["first", "second", "nested"]);
    }

    #[test]
    fn test_panicking_job_releases_queue() {
        let result = panic::catch_unwind(|| {
            deliver(vec![Box::new(|| panic!("job failed")) as Job]);
        });
        assert!(result.is_err());

        let seen = Rc::new(RefCell::new(false));
        let flag = seen.clone();
        deliver(vec![Box::new(move || *flag.borrow_mut() = true) as Job]);
        assert!(*seen.borrow());
    }
}
