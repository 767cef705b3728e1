mod common;

use std::sync::Arc;
use std::time::Duration;

use beflow::protocol::{ADVISORY_SIZE, TABLE_ENTRY_SIZE};
use beflow::{BestEffortTable, Condition, ManualClock, PathId, SplitterConfig};
use common::*;

fn deliver(
    controller: &mut beflow::CongestionController<MockNetwork>,
    table: &mut BestEffortTable,
    to: u32,
) -> usize {
    let messages = controller.network_mut().drain_wire(router(to));
    for bytes in &messages {
        assert!(bytes.len() == ADVISORY_SIZE || bytes.len() == TABLE_ENTRY_SIZE);
        table.process_message(bytes.clone()).unwrap();
    }
    messages.len()
}

fn paths_by_bucket(table: &mut BestEffortTable) -> Vec<PathId> {
    (0..10)
        .map(|bucket| table.resolve(iface(2), bucket).unwrap().path())
        .collect()
}

fn router_one() -> (BestEffortTable, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_at(Duration::from_secs(10_000)));
    (
        BestEffortTable::new(SplitterConfig::default(), clock.clone()),
        clock,
    )
}

#[test]
fn deployment_reaches_router_table() {
    let (mut controller, _) = two_node_controller(|_| {});
    let (mut table, _) = router_one();

    assert_eq!(deliver(&mut controller, &mut table, 1), 2);
    assert!(table.accepts_edge_traffic());
    assert!(table.has_entry(iface(2)));
    assert!(!table.has_entry(iface(1)));
    assert_eq!(paths_by_bucket(&mut table), vec![pid(10); 10]);
}

#[test]
fn yellow_advisory_shifts_deciles_and_green_reverts() {
    let (mut controller, _) = two_node_controller(|_| {});
    let (mut table, router_clock) = router_one();
    deliver(&mut controller, &mut table, 1);

    controller.monitor(pid(10), 500).unwrap();
    deliver(&mut controller, &mut table, 1);
    assert_eq!(
        table.destination(iface(2)).unwrap().condition(),
        Condition::Yellow
    );

    for _ in 0..3 {
        router_clock.advance(Duration::from_millis(201));
        table.resolve(iface(2), 0);
    }
    assert_eq!(table.destination(iface(2)).unwrap().split(), [70, 30]);
    assert_eq!(table.resolve(iface(2), 9).unwrap().path(), pid(11));

    controller.monitor(pid(10), 10).unwrap();
    deliver(&mut controller, &mut table, 1);
    table.resolve(iface(2), 0);
    assert_eq!(table.destination(iface(2)).unwrap().split(), [80, 20]);
}

#[test]
fn failure_cuts_over_then_installs_new_generation() {
    let (mut controller, _) = two_node_controller(|net| {
        net.script(
            1,
            2,
            beflow::control::Criterion::ShortestWidestMostDisjoint,
            vec![path(11, 1, 2, 500), path(13, 1, 2, 800)],
        );
    });
    let (mut table, _) = router_one();
    deliver(&mut controller, &mut table, 1);

    controller.notify_path_failed(pid(10)).unwrap();
    // RED advisory, then the (11, 13) pair
    assert_eq!(deliver(&mut controller, &mut table, 1), 3);

    let state = table.destination(iface(2)).unwrap();
    assert_eq!(state.ring().current(), 2);
    assert_eq!(state.split(), [100, 0]);
    assert_eq!(table.entry(iface(2), 0).unwrap().path(), pid(11));
    assert_eq!(table.entry(iface(2), 3).unwrap().path(), pid(13));
    assert_eq!(paths_by_bucket(&mut table), vec![pid(11); 10]);
}

#[test]
fn switchback_pair_puts_all_traffic_on_primary() {
    let (mut controller, _) = two_node_controller(|_| {});
    let (mut table, _) = router_one();
    deliver(&mut controller, &mut table, 1);
    table.apply_advisory(beflow::CongestionAdvisory::new(pid(10), Condition::Yellow));
    table.resolve(iface(2), 0);
    assert_eq!(table.destination(iface(2)).unwrap().split(), [90, 10]);

    controller.monitor(pid(11), 500).unwrap();
    deliver(&mut controller, &mut table, 1);

    assert_eq!(paths_by_bucket(&mut table), vec![pid(10); 10]);
    assert!(!table.destination(iface(2)).unwrap().using_alternate());
}
