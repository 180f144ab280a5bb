mod common;

use common::{Capture, ManualClock, encode, msg};
use oscreplay_tools::{
    GroupAggregator, PlaybackScheduler, RecordingStats,
    network::{GroupListener, dispatch_packet},
    proto::{Group, RawMessage, Timetag},
    stream::{GroupReader, GroupWriter},
};
use std::io;

const NOW: Timetag = Timetag::new(3_900_000_000, 42);

fn aggregator() -> GroupAggregator<Vec<u8>, ManualClock> {
    GroupAggregator::new(GroupWriter::new(Vec::new()), ManualClock::new(NOW))
}

fn stored(aggregator: GroupAggregator<Vec<u8>, ManualClock>) -> (Vec<Group>, RecordingStats) {
    let (stats, bytes) = aggregator.finish().unwrap();
    let groups = GroupReader::new(bytes.as_slice())
        .collect::<io::Result<Vec<_>>>()
        .unwrap();
    (groups, stats)
}

fn send(aggregator: &mut impl GroupListener, message: &RawMessage) {
    aggregator
        .on_message(message.address(), message.payload())
        .unwrap();
}

#[test]
fn explicit_group() {
    let t = Timetag::new(3_800_000_000, 7);
    let mut agg = aggregator();

    agg.on_group_start(t).unwrap();
    assert!(agg.inside_group());
    send(&mut agg, &msg("/a", 1));
    send(&mut agg, &msg("/b", 2));

    // nothing is stored before the group ends
    assert_eq!(agg.stats(), RecordingStats::default());

    agg.on_group_end().unwrap();
    assert!(!agg.inside_group());

    let (groups, stats) = stored(agg);
    assert_eq!(
        groups,
        [Group::with_messages(t, [msg("/a", 1), msg("/b", 2)])]
    );
    assert_eq!(
        stats,
        RecordingStats {
            groups: 1,
            messages: 2
        }
    );
}

#[test]
fn immediate_groups_are_stamped_on_arrival() {
    let mut agg = aggregator();

    agg.on_group_start(Timetag::IMMEDIATE).unwrap();
    send(&mut agg, &msg("/a", 1));
    agg.on_group_end().unwrap();

    let (groups, _) = stored(agg);
    assert_eq!(groups[0].timestamp, NOW);
}

#[test]
fn loose_messages_get_their_own_group() {
    let mut agg = aggregator();

    send(&mut agg, &msg("/a", 1));
    send(&mut agg, &msg("/b", 2));

    // stored right away
    assert_eq!(agg.stats().groups, 2);

    let (groups, _) = stored(agg);
    assert_eq!(
        groups,
        [
            Group::with_messages(NOW, [msg("/a", 1)]),
            Group::with_messages(NOW, [msg("/b", 2)]),
        ]
    );
}

#[test]
fn nested_groups_are_flattened() {
    let outer = Timetag::new(10, 0);
    let mut agg = aggregator();

    agg.on_group_start(outer).unwrap();
    send(&mut agg, &msg("/a", 1));
    agg.on_group_start(Timetag::new(20, 0)).unwrap();
    send(&mut agg, &msg("/b", 2));
    agg.on_group_end().unwrap();

    assert!(agg.inside_group());
    send(&mut agg, &msg("/c", 3));
    agg.on_group_end().unwrap();

    let (groups, _) = stored(agg);
    assert_eq!(
        groups,
        [Group::with_messages(
            outer,
            [msg("/a", 1), msg("/b", 2), msg("/c", 3)]
        )]
    );
}

#[test]
fn stray_group_end_is_ignored() {
    let mut agg = aggregator();

    agg.on_group_end().unwrap();
    send(&mut agg, &msg("/a", 1));

    let (groups, _) = stored(agg);
    assert_eq!(groups, [Group::with_messages(NOW, [msg("/a", 1)])]);
}

#[test]
fn open_group_is_lost_on_finish() {
    let mut agg = aggregator();

    send(&mut agg, &msg("/kept", 1));
    agg.on_group_start(Timetag::new(10, 0)).unwrap();
    send(&mut agg, &msg("/lost", 2));

    let (groups, stats) = stored(agg);
    assert_eq!(groups, [Group::with_messages(NOW, [msg("/kept", 1)])]);
    assert_eq!(stats.messages, 1);
}

#[test]
fn malformed_messages_are_dropped() {
    let mut agg = aggregator();

    agg.on_group_start(Timetag::new(10, 0)).unwrap();
    agg.on_message("/bad", b"/bad").unwrap();
    send(&mut agg, &msg("/good", 1));
    agg.on_group_end().unwrap();

    let (groups, _) = stored(agg);
    assert_eq!(groups[0].messages, [msg("/good", 1)]);
}

#[test]
fn storage_failures_are_returned() {
    struct Full;

    impl io::Write for Full {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::StorageFull.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let mut agg = GroupAggregator::new(GroupWriter::new(Full), ManualClock::new(NOW));

    agg.on_group_start(Timetag::new(10, 0)).unwrap();
    send(&mut agg, &msg("/a", 1));

    let err = agg.on_group_end().unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::StorageFull);
}

#[test]
fn datagrams_to_file_and_back() {
    let recorded = vec![
        Group::with_messages(Timetag::new(3_800_000_000, 0), [msg("/a", 1)]),
        Group::with_messages(Timetag::new(3_800_000_001, 0), [msg("/b", 2), msg("/c", 3)]),
    ];

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.osc");

    let output = oscreplay_tools::open_output(&path).unwrap();
    let mut agg = GroupAggregator::new(GroupWriter::new(output), ManualClock::new(NOW));

    for group in &recorded {
        dispatch_packet(&encode(std::slice::from_ref(group)), &mut agg).unwrap();
    }
    dispatch_packet(msg("/loose", 4).payload(), &mut agg).unwrap();

    let (stats, _) = agg.finish().unwrap();
    assert_eq!(
        stats,
        RecordingStats {
            groups: 3,
            messages: 4
        }
    );

    // the stream is a plain concatenation of bundles
    let bytes = std::fs::read(&path).unwrap();
    let mut expected = encode(&recorded);
    expected.extend(encode(&[Group::with_messages(NOW, [msg("/loose", 4)])]));
    assert_eq!(bytes, expected);

    let start = Timetag::new(3_950_000_000, 0);
    let clock = ManualClock::new(start);
    let mut capture = Capture::new(clock.clone());

    let input = oscreplay_tools::open_input(&path).unwrap();
    PlaybackScheduler::new(clock, 0.)
        .run(&mut GroupReader::new(input), &mut capture)
        .unwrap();

    let played = capture
        .sent
        .iter()
        .map(|(_, group)| group.messages.clone())
        .collect::<Vec<_>>();

    assert_eq!(
        played,
        [
            vec![msg("/a", 1)],
            vec![msg("/b", 2), msg("/c", 3)],
            vec![msg("/loose", 4)],
        ]
    );
}
