//! End-to-end scenarios for live views.
//!
//! Each scenario wires a view to an `ObservableList`, edits the list and
//! checks both the view's snapshot and the notifications it published.

use liveseq_reactive::{
    ChangeEvent, ChangeSource, Disposable, FilteredView, LiveView, MappedView, MutableSource, ObservableList,
    Property, Refresher, RefresherConfig, SharedScheduler, Subscription, ThrottledView, Trigger,
    VirtualScheduler,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type EventLog<T> = Arc<Mutex<Vec<ChangeEvent<T>>>>;

/// Helper to record every collection notification of a view.
fn record<T, V>(view: &V) -> (EventLog<T>, Subscription)
where
    T: liveseq_reactive::Element,
    V: LiveView<T>,
{
    let log: EventLog<T> = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    let sub = view
        .subscribe_collection(move |event| l.lock().push(event.clone()))
        .unwrap();
    (log, sub)
}

/// Helper to build an identity view over `list`.
fn identity(list: &Arc<ObservableList<i32>>) -> FilteredView<i32, ObservableList<i32>> {
    FilteredView::builder()
        .source(list.clone())
        .predicate(|_: &i32| true)
        .build()
        .unwrap()
}

#[test]
fn test_single_add() {
    let list = Arc::new(ObservableList::from_vec(vec![1, 2, 3]));
    let view = identity(&list);
    let (log, _sub) = record(&view);

    list.push(4);

    assert_eq!(view.current().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(*log.lock(), vec![ChangeEvent::add(4, 3)]);
}

#[test]
fn test_single_remove() {
    let list = Arc::new(ObservableList::from_vec(vec![1, 2, 3]));
    let view = identity(&list);
    let (log, _sub) = record(&view);

    list.remove_at(1).unwrap();

    assert_eq!(view.current().unwrap(), vec![1, 3]);
    assert_eq!(*log.lock(), vec![ChangeEvent::remove(2, 1)]);
}

#[test]
fn test_swap_is_a_move() {
    let list = Arc::new(ObservableList::from_vec(vec![1, 2]));
    let view = identity(&list);
    let (log, _sub) = record(&view);

    list.replace_all(vec![2, 1]);

    assert_eq!(view.current().unwrap(), vec![2, 1]);
    assert_eq!(*log.lock(), vec![ChangeEvent::moved(1, 1, 0)]);
}

#[test]
fn test_reversal_is_a_reset() {
    let list = Arc::new(ObservableList::from_vec(vec![1, 2, 3]));
    let view = identity(&list);
    let (log, _sub) = record(&view);

    list.replace_all(vec![3, 2, 1]);

    assert_eq!(*log.lock(), vec![ChangeEvent::Reset]);
}

#[test]
fn test_debounce_coalesces_into_one_reset() {
    let list = Arc::new(ObservableList::<i32>::new());
    let scheduler = VirtualScheduler::shared();

    let batches = Arc::new(Mutex::new(Vec::new()));
    let config = RefresherConfig::new()
        .with_buffer_time(Duration::from_millis(10))
        .with_scheduler(scheduler.clone());
    let refresher = Refresher::new(list.clone(), Vec::new(), config);
    let b = batches.clone();
    let _pipeline = refresher.subscribe(move |batch| b.lock().push(batch.clone()));

    let view = ThrottledView::builder()
        .source(list.clone())
        .buffer_time(Duration::from_millis(10))
        .scheduler(scheduler.clone() as SharedScheduler)
        .build()
        .unwrap();
    let (log, _sub) = record(&view);

    list.push(1);
    scheduler.advance_by(Duration::from_millis(4));
    list.push(2);
    scheduler.advance_by(Duration::from_millis(4));
    list.push(3);
    scheduler.advance_by(Duration::from_millis(10));

    assert_eq!(
        *batches.lock(),
        vec![vec![
            ChangeEvent::add(1, 0),
            ChangeEvent::add(2, 1),
            ChangeEvent::add(3, 2),
        ]]
    );
    assert_eq!(view.current().unwrap(), vec![1, 2, 3]);
    assert_eq!(*log.lock(), vec![ChangeEvent::Reset]);
}

#[test]
fn test_refresh_is_idempotent() {
    let list = Arc::new(ObservableList::from_vec(vec![1, 2]));
    let trigger = Trigger::new();
    let view = FilteredView::builder()
        .source(list.clone())
        .predicate(|_: &i32| true)
        .trigger(trigger.clone())
        .build()
        .unwrap();
    let (log, _sub) = record(&view);

    trigger.fire();
    trigger.fire();

    assert!(log.lock().is_empty());
    assert_eq!(view.current().unwrap(), vec![1, 2]);
}

#[test]
fn test_property_notifications_follow_event_kind() {
    let list = Arc::new(ObservableList::from_vec(vec![1, 2]));
    let view = identity(&list);
    let properties = Arc::new(Mutex::new(Vec::new()));
    let p = properties.clone();
    let _sub = view
        .subscribe_property(move |property| p.lock().push(property.name()))
        .unwrap();

    list.push(3);
    list.set(0, 7).unwrap();

    assert_eq!(*properties.lock(), vec!["Count", "Item[]", "Item[]"]);
    assert!(matches!(Property::affected_by(liveseq_reactive::ChangeKind::Add), [Property::Count, Property::Indexer]));
}

struct Handle {
    released: Arc<AtomicUsize>,
}

impl Disposable for Handle {
    fn dispose(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_disposal_releases_derived_values_once() {
    let released = Arc::new(AtomicUsize::new(0));
    let list = Arc::new(ObservableList::from_vec(vec![Arc::new(1), Arc::new(2)]));
    let r = released.clone();
    let view = MappedView::builder()
        .source(list.clone())
        .selector(move |_: &Arc<i32>| {
            Arc::new(Handle {
                released: r.clone(),
            })
        })
        .with_disposal()
        .build()
        .unwrap();

    list.push(Arc::new(3));
    assert_eq!(view.len().unwrap(), 3);
    assert_eq!(released.load(Ordering::SeqCst), 0);

    view.dispose();
    view.dispose();

    assert_eq!(released.load(Ordering::SeqCst), 3);
    assert_eq!(list.observer_count(), 0);
    assert!(view.len().unwrap_err().is_disposed());
}

#[test]
fn test_filtered_edits_reach_source() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let list = Arc::new(ObservableList::from_vec(vec![1, 2, 3, 4]));
    let evens = FilteredView::builder()
        .source(list.clone())
        .predicate(|x: &i32| x % 2 == 0)
        .build()
        .unwrap();

    list.push(6);
    list.push(7);
    evens.remove(&2).unwrap();

    assert_eq!(evens.current().unwrap(), vec![4, 6]);
    assert_eq!(list.snapshot(), vec![1, 3, 4, 6, 7]);
}
