//! Bridge integration tests: hooks + policy + bus, driven the way host glue
//! would drive them.

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use relay_bridge::{
        Achievement, AchievementCompleted, AchievementId, Bridge, CompletionState, DeathCause,
        Display, EventBus, GrantOutcome, ParticipantDied, ParticipantJoined, ParticipantLeft,
        ParticipantRef, WorldRules,
    };
    use std::cell::RefCell;
    use std::sync::Arc;

    fn alice() -> ParticipantRef {
        ParticipantRef::new("u-alice", "alice")
    }

    fn rules(announce: bool) -> WorldRules {
        WorldRules {
            announce_achievements: announce,
        }
    }

    fn record<E>(bus: &EventBus) -> Arc<Mutex<Vec<E>>>
    where
        E: relay_bridge::BridgeEvent + Clone,
    {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe_fn(move |e: &E| {
            sink.lock().push(e.clone());
            Ok(())
        });
        seen
    }

    /// Grant every criterion in `criteria` in order, the way the host would:
    /// update progress first, then call the hook.
    fn grant_all(
        bridge: &Bridge,
        achievement: &Achievement,
        criteria: &[&str],
        world: WorldRules,
    ) -> Vec<GrantOutcome> {
        let state = RefCell::new(CompletionState::pending(criteria.iter().copied()));
        let progress = |_: &ParticipantRef, _: &AchievementId| -> Option<CompletionState> {
            Some(state.borrow().clone())
        };

        criteria
            .iter()
            .map(|criterion| {
                state.borrow_mut().grant(criterion);
                bridge.on_criterion_granted(&alice(), achievement, criterion, &progress, &world)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Completion scenarios
    // -----------------------------------------------------------------------

    #[test]
    fn announced_display_in_announcing_world() {
        let bridge = Bridge::default();
        let seen = record::<AchievementCompleted>(bridge.bus());
        let achievement =
            Achievement::new("story/mine_stone", Some(Display::new("Stone Age", true)));

        grant_all(&bridge, &achievement, &["get_stone"], rules(true));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].should_announce);
        assert_eq!(seen[0].achievement.id.as_str(), "story/mine_stone");
    }

    #[test]
    fn announced_display_in_silent_world() {
        let bridge = Bridge::default();
        let seen = record::<AchievementCompleted>(bridge.bus());
        let achievement =
            Achievement::new("story/mine_stone", Some(Display::new("Stone Age", true)));

        grant_all(&bridge, &achievement, &["get_stone"], rules(false));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].should_announce);
    }

    #[test]
    fn missing_display_in_announcing_world() {
        let bridge = Bridge::default();
        let seen = record::<AchievementCompleted>(bridge.bus());
        let achievement = Achievement::new("recipes/misc/bread", None);

        grant_all(&bridge, &achievement, &["has_wheat"], rules(true));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].should_announce);
    }

    #[test]
    fn completion_fires_on_the_second_of_two_grants() {
        let bridge = Bridge::default();
        let seen = record::<AchievementCompleted>(bridge.bus());
        let achievement =
            Achievement::new("nether/obtain_blaze_rod", Some(Display::new("Into Fire", true)));

        let outcomes = grant_all(
            &bridge,
            &achievement,
            &["blaze_rod", "blaze_powder"],
            rules(true),
        );

        assert_eq!(outcomes[0], GrantOutcome::NotDone);
        assert!(matches!(
            outcomes[1],
            GrantOutcome::Published {
                should_announce: true,
                ..
            }
        ));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn repeated_grants_after_completion_stay_silent() {
        let bridge = Bridge::default();
        let seen = record::<AchievementCompleted>(bridge.bus());
        let achievement = Achievement::new("story/root", Some(Display::new("Minecraft", true)));

        let mut done = CompletionState::pending(["crafting_table"]);
        done.grant("crafting_table");
        let progress = move |_: &ParticipantRef, _: &AchievementId| Some(done.clone());

        let outcomes: Vec<_> = (0..3)
            .map(|_| {
                bridge.on_criterion_granted(
                    &alice(),
                    &achievement,
                    "crafting_table",
                    &progress,
                    &rules(true),
                )
            })
            .collect();

        assert!(matches!(outcomes[0], GrantOutcome::Published { .. }));
        assert_eq!(outcomes[1], GrantOutcome::AlreadyCompleted);
        assert_eq!(outcomes[2], GrantOutcome::AlreadyCompleted);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn completions_are_tracked_per_participant() {
        let bridge = Bridge::default();
        let seen = record::<AchievementCompleted>(bridge.bus());
        let achievement = Achievement::new("story/root", Some(Display::new("Minecraft", true)));

        let mut done = CompletionState::pending(["crafting_table"]);
        done.grant("crafting_table");
        let progress = move |_: &ParticipantRef, _: &AchievementId| Some(done.clone());

        let bob = ParticipantRef::new("u-bob", "bob");
        bridge.on_criterion_granted(
            &alice(),
            &achievement,
            "crafting_table",
            &progress,
            &rules(true),
        );
        bridge.on_criterion_granted(&bob, &achievement, "crafting_table", &progress, &rules(true));

        let names: Vec<_> = seen.lock().iter().map(|e| e.participant.name.clone()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    // -----------------------------------------------------------------------
    // Presence + death
    // -----------------------------------------------------------------------

    #[test]
    fn presence_and_death_events_reach_their_subscribers() {
        let bridge = Bridge::default();
        let joined = record::<ParticipantJoined>(bridge.bus());
        let left = record::<ParticipantLeft>(bridge.bus());
        let died = record::<ParticipantDied>(bridge.bus());

        bridge.on_participant_connected(&alice());
        bridge.on_participant_death(&alice(), &DeathCause::new("alice hit the ground too hard"));
        bridge.on_participant_removed(&alice());

        assert_eq!(joined.lock().len(), 1);
        assert_eq!(left.lock().len(), 1);
        assert_eq!(died.lock()[0].cause.message(), "alice hit the ground too hard");
    }

    // -----------------------------------------------------------------------
    // Failure isolation
    // -----------------------------------------------------------------------

    #[test]
    fn failing_subscriber_does_not_starve_the_next() {
        let bridge = Bridge::default();
        bridge
            .bus()
            .subscribe_fn(|_: &AchievementCompleted| anyhow::bail!("chat service unavailable"));
        let seen = record::<AchievementCompleted>(bridge.bus());
        let achievement =
            Achievement::new("story/mine_stone", Some(Display::new("Stone Age", true)));

        let outcomes = grant_all(&bridge, &achievement, &["get_stone"], rules(true));

        match outcomes[0] {
            GrantOutcome::Published { delivery, .. } => {
                assert_eq!(delivery.delivered, 1);
                assert_eq!(delivery.failed, 1);
            }
            other => panic!("expected publish, got {:?}", other),
        }
        assert_eq!(seen.lock().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Concurrent publish
    // -----------------------------------------------------------------------

    #[test]
    fn shared_bus_handles_concurrent_worlds() {
        let bus = Arc::new(EventBus::new());
        let seen = record::<ParticipantJoined>(&bus);

        std::thread::scope(|scope| {
            for world in 0..4 {
                let bridge = Bridge::new(bus.clone());
                scope.spawn(move || {
                    for n in 0..25 {
                        bridge.on_participant_connected(&ParticipantRef::new(
                            format!("w{}-p{}", world, n),
                            format!("player{}", n),
                        ));
                    }
                });
            }
        });

        assert_eq!(seen.lock().len(), 100);
    }
}
