use noodle_animation_core::{
    glam::{Quat, Vec3},
    BeatTimeMap, ClockSample, CoreEvent, CustomEvent, CustomEventKind, Engine, EntityKind,
    EntitySource, EventData, GeometrySource, TrackRef,
};
use serde_json::json;

fn note_on(tracks: &[&str], song_time: f32) -> EntitySource {
    let mut src = EntitySource::new(EntityKind::Note, song_time, song_time - 2.0, 2.0);
    src.custom.track = Some(match tracks {
        [one] => TrackRef::One(one.to_string()),
        many => TrackRef::Many(many.iter().map(|t| t.to_string()).collect()),
    });
    src
}

fn event(kind: CustomEventKind, track: &str, beat: f32, duration: f32, props: serde_json::Value) -> CustomEvent {
    let mut data = EventData {
        track: Some(TrackRef::One(track.into())),
        duration: Some(duration),
        ..EventData::default()
    };
    if let serde_json::Value::Object(map) = props {
        data.properties.extend(map);
    }
    CustomEvent::new(beat, kind, data)
}

fn parent(parent: &str, children: &[&str]) -> CustomEvent {
    let data = EventData {
        parent_track: Some(parent.into()),
        children_tracks: Some(children.iter().map(|c| c.to_string()).collect()),
        ..EventData::default()
    };
    CustomEvent::new(0.0, CustomEventKind::AssignTrackParent, data)
}

fn track_events(events: &[CoreEvent]) -> (Vec<u32>, Vec<u32>) {
    let mut enabled = Vec::new();
    let mut disabled = Vec::new();
    for ev in events {
        match ev {
            CoreEvent::TrackEnabled { track } => enabled.push(track.0),
            CoreEvent::TrackDisabled { track } => disabled.push(track.0),
            _ => {}
        }
    }
    (enabled, disabled)
}

#[test]
fn disabling_the_last_child_disables_every_ancestor() {
    let mut engine = Engine::default();
    engine.load_events(vec![parent("root", &["mid"]), parent("mid", &["leaf"])]);
    let root = engine.track_id("root").unwrap();
    let mid = engine.track_id("mid").unwrap();
    let leaf = engine.track_id("leaf").unwrap();
    for t in [root, mid, leaf] {
        assert!(!engine.track(t).unwrap().is_enabled());
    }

    let e = engine.spawn_entity();
    engine.configure_entity(e, &note_on(&["leaf"], 10.0));
    for t in [root, mid, leaf] {
        assert!(engine.track(t).unwrap().is_enabled());
    }
    let (enabled, disabled) = track_events(&engine.update(ClockSample::at(9.0)).events);
    assert_eq!(enabled, vec![leaf.0, mid.0, root.0]);
    assert!(disabled.is_empty());

    engine.set_entity_enabled(e, false);
    for t in [root, mid, leaf] {
        assert!(!engine.track(t).unwrap().is_enabled());
    }
    let driver = engine.track_driver(mid).unwrap();
    assert!(!engine.entity(driver).unwrap().is_enabled());

    let (enabled, disabled) = track_events(&engine.update(ClockSample::at(9.5)).events);
    assert!(enabled.is_empty());
    assert_eq!(disabled, vec![leaf.0, mid.0, root.0]);
}

#[test]
fn shared_grandchild_disables_both_branches_of_a_diamond() {
    let mut engine = Engine::default();
    engine.load_events(vec![
        parent("x", &["y", "z"]),
        parent("y", &["w"]),
        parent("z", &["w"]),
    ]);
    let [x, y, z, w] = ["x", "y", "z", "w"].map(|name| engine.track_id(name).unwrap());
    let y_driver = engine.track_driver(y).unwrap();
    let z_driver = engine.track_driver(z).unwrap();

    let e = engine.spawn_entity();
    engine.configure_entity(e, &note_on(&["w"], 10.0));
    for t in [x, y, z, w] {
        assert!(engine.track(t).unwrap().is_enabled());
    }
    let mut drivers = engine.track(x).unwrap().enabled_children().to_vec();
    drivers.sort_by_key(|d| d.0);
    assert_eq!(drivers, vec![y_driver, z_driver]);
    let (enabled, _) = track_events(&engine.update(ClockSample::at(9.0)).events);
    assert_eq!(enabled.iter().filter(|t| **t == x.0).count(), 1);

    engine.set_entity_enabled(e, false);
    for t in [x, y, z, w] {
        assert!(!engine.track(t).unwrap().is_enabled());
    }
    assert!(engine.track(x).unwrap().enabled_children().is_empty());
    let (enabled, mut disabled) = track_events(&engine.update(ClockSample::at(9.5)).events);
    assert!(enabled.is_empty());
    disabled.sort_unstable();
    let mut expected = vec![x.0, y.0, z.0, w.0];
    expected.sort_unstable();
    assert_eq!(disabled, expected);
}

#[test]
fn reconfiguring_on_the_same_track_keeps_it_quiet() {
    let mut engine = Engine::default();
    engine.load_events(vec![parent("stage", &["lane"])]);
    let e = engine.spawn_entity();
    let src = note_on(&["lane"], 10.0);
    engine.configure_entity(e, &src);
    let (enabled, _) = track_events(&engine.update(ClockSample::at(9.0)).events);
    assert_eq!(enabled.len(), 2);

    engine.configure_entity(e, &src);
    engine.configure_entity(e, &note_on(&["lane"], 12.0));
    let (enabled, disabled) = track_events(&engine.update(ClockSample::at(9.5)).events);
    assert!(enabled.is_empty());
    assert!(disabled.is_empty());
    let lane = engine.track_id("lane").unwrap();
    assert_eq!(engine.track(lane).unwrap().children(), &[e]);
}

#[test]
fn geometry_folds_track_rotations_in_authored_order() {
    let mut data = EventData {
        track: Some(TrackRef::One("ring".into())),
        duration: Some(1.0),
        ..EventData::default()
    };
    data.properties
        .insert("offsetWorldRotation".into(), json!([[90, 0, 0, 0]]));
    data.properties
        .insert("localRotation".into(), json!([[0, 90, 0, 0]]));
    let mut engine = Engine::default();
    engine.load_events(vec![CustomEvent::new(0.0, CustomEventKind::AnimateTrack, data)]);

    let g = engine.spawn_entity();
    let source = GeometrySource {
        track: Some("ring".into()),
        ..GeometrySource::default()
    };
    assert!(engine.configure_geometry(g, &source));

    let out = engine.update(ClockSample::at(0.5));
    let rotation = out.change_for(g).expect("geometry rotated").local.rotation;
    let x = Quat::from_rotation_x(90f32.to_radians());
    let y = Quat::from_rotation_y(90f32.to_radians());
    assert!(rotation.abs_diff_eq(x * y, 1e-5), "{rotation:?}");
    assert!(!rotation.abs_diff_eq(y * x, 1e-3));
}

#[test]
fn parent_track_moves_the_child_track_driver() {
    let mut engine = Engine::default();
    engine.load_events(vec![
        parent("stage", &["lane"]),
        event(
            CustomEventKind::AnimateTrack,
            "stage",
            0.0,
            2.0,
            json!({ "_position": [[0, 0, 0, 0], [0, 4, 0, 1]] }),
        ),
    ]);
    let e = engine.spawn_entity();
    engine.configure_entity(e, &note_on(&["lane"], 10.0));
    let lane = engine.track_id("lane").unwrap();
    let driver = engine.track_driver(lane).unwrap();

    let out = engine.update(ClockSample::at(1.0));
    let state = out.change_for(driver).expect("driver moved");
    assert!(state.local.position.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-6));
    // The note itself is only moved through its anchor's parent.
    assert!(out
        .change_for(e)
        .is_some_and(|s| s.local.position == Vec3::ZERO));
}

#[test]
fn reloading_events_is_idempotent() {
    let events = vec![
        parent("root", &["a"]),
        event(
            CustomEventKind::AnimateTrack,
            "a",
            0.0,
            1.0,
            json!({ "dissolve": [[0.5, 0]], "scale": [[2, 2, 2, 0]] }),
        ),
    ];
    let mut engine = Engine::default();
    engine.load_events(events.clone());
    let e = engine.spawn_entity();
    engine.configure_entity(e, &note_on(&["a"], 10.0));
    let first = *engine.update(ClockSample::at(5.0)).change_for(e).unwrap();

    engine.load_events(events.clone());
    engine.load_events(events);
    let a = engine.track_id("a").unwrap();
    let root = engine.track_id("root").unwrap();
    assert_eq!(engine.track(a).unwrap().channels().len(), 2);
    assert_eq!(engine.track(a).unwrap().parents(), &[root]);
    assert_eq!(engine.track(root).unwrap().children().len(), 1);
    assert_eq!(engine.tracks().count(), 2);

    engine.update(ClockSample::at(5.5));
    let state = engine.entity(e).unwrap().output();
    assert_eq!(state.material.opacity, first.material.opacity);
    assert_eq!(state.local.scale, first.local.scale);
}

#[test]
fn track_time_channel_scrubs_its_children() {
    let mut engine = Engine::default();
    engine.load_events(vec![event(
        CustomEventKind::AnimateTrack,
        "clock",
        0.0,
        4.0,
        json!({ "time": [[0, 0], [1, 1]] }),
    )]);
    let mut src = note_on(&["clock"], 10.0);
    src.custom.animation = Some(
        [("dissolve".to_string(), json!([[0, 0], [1, 1]]))]
            .into_iter()
            .collect(),
    );
    let e = engine.spawn_entity();
    engine.configure_entity(e, &src);

    // Beat 2 is halfway through the event: the window [8, 12] is sampled at 10.
    let state = *engine.update(ClockSample::at(2.0)).change_for(e).unwrap();
    assert_eq!(engine.entity(e).unwrap().time_override(), Some(10.0));
    assert!((state.material.opacity - 0.5).abs() < 1e-6);
}

#[test]
fn armed_entities_recycle_past_their_despawn_point() {
    let mut engine = Engine::default();
    let e = engine.spawn_entity();
    engine.configure_entity(e, &note_on(&["lane"], 10.0));
    engine.arm_recycle(e);
    let lane = engine.track_id("lane").unwrap();

    let out = engine.update(ClockSample::at(10.0));
    assert!(!out.events.contains(&CoreEvent::RecycleRequested { entity: e }));

    let out = engine.update(ClockSample::at(10.5));
    assert!(out.events.contains(&CoreEvent::RecycleRequested { entity: e }));
    assert!(out.events.contains(&CoreEvent::TrackDisabled { track: lane }));
    assert!(out.change_for(e).is_none());
    assert!(!engine.entity(e).unwrap().is_enabled());
    assert!(!engine.track(lane).unwrap().is_enabled());

    // Reconfiguring a recycled entity brings it back.
    engine.configure_entity(e, &note_on(&["lane"], 20.0));
    assert!(engine.track(lane).unwrap().is_enabled());
    assert!(engine.update(ClockSample::at(19.0)).change_for(e).is_some());
}

#[test]
fn paused_time_changes_snap_local_transforms() {
    let mut engine = Engine::default();
    let mut src = note_on(&["lane"], 10.0);
    src.custom.local_rotation = Some(json!([0, 90, 0]));
    let e = engine.spawn_entity();
    engine.configure_entity(e, &src);

    assert!(engine.notify_time_changed(ClockSample::at(3.0)).is_empty());

    let out = engine.notify_time_changed(ClockSample::at(3.0).paused());
    let state = out.change_for(e).expect("snapped");
    assert!(state
        .local
        .rotation
        .abs_diff_eq(Quat::from_rotation_y(90f32.to_radians()), 1e-6));
    assert!(out.events.is_empty());
}

#[test]
fn removing_an_entity_detaches_it_from_its_tracks() {
    let mut engine = Engine::default();
    let a = engine.spawn_entity();
    let b = engine.spawn_entity();
    engine.configure_entity(a, &note_on(&["lane"], 10.0));
    engine.configure_entity(b, &note_on(&["lane", "side"], 12.0));
    let lane = engine.track_id("lane").unwrap();
    let side = engine.track_id("side").unwrap();
    assert_eq!(engine.track(lane).unwrap().children(), &[a, b]);

    assert!(engine.remove_entity(b));
    assert!(engine.entity(b).is_none());
    assert_eq!(engine.track(lane).unwrap().children(), &[a]);
    assert!(engine.track(lane).unwrap().is_enabled());
    assert!(engine.track(side).unwrap().children().is_empty());
    assert!(!engine.track(side).unwrap().is_enabled());
    assert!(!engine.remove_entity(b));
}

struct DoubleTime;

impl BeatTimeMap for DoubleTime {
    fn beat_to_song_time(&self, beat: f32) -> f32 {
        beat * 2.0
    }
}

#[test]
fn path_transitions_are_measured_in_song_time() {
    let mut engine = Engine::default();
    engine.set_beat_map(Box::new(DoubleTime));
    let mut assign = event(
        CustomEventKind::AssignPathAnimation,
        "lane",
        1.0,
        1.0,
        json!({ "dissolve": [[0.5, 0]] }),
    );
    assign.song_time = Some(2.0);
    engine.load_events(vec![assign]);

    let e = engine.spawn_entity();
    engine.configure_entity(e, &note_on(&["lane"], 10.0));

    // Beats [1, 2] span song time [2, 4]: halfway in at song time 3.
    engine.update(ClockSample::at(1.0));
    assert_eq!(engine.entity(e).unwrap().output().material.opacity, 1.0);
    let state = *engine.update(ClockSample::at(3.0)).change_for(e).unwrap();
    assert!((state.material.opacity - 0.75).abs() < 1e-6);
    let state = *engine.update(ClockSample::at(4.0)).change_for(e).unwrap();
    assert!((state.material.opacity - 0.5).abs() < 1e-6);
}

#[test]
fn malformed_track_curves_surface_as_events() {
    let mut engine = Engine::default();
    engine.load_events(vec![event(
        CustomEventKind::AnimateTrack,
        "lane",
        0.0,
        1.0,
        json!({ "color": "missing", "dissolve": [[0.5, 0]] }),
    )]);
    let lane = engine.track_id("lane").unwrap();
    let out = engine.update(ClockSample::at(0.0));
    let rejected: Vec<&CoreEvent> = out
        .events
        .iter()
        .filter(|ev| matches!(ev, CoreEvent::CurveRejected { .. }))
        .collect();
    assert_eq!(rejected.len(), 1);
    assert!(matches!(
        rejected[0],
        CoreEvent::CurveRejected { track: Some(t), entity: None, .. } if *t == lane
    ));
    assert_eq!(engine.track(lane).unwrap().channels().len(), 1);
}
