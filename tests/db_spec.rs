use chrono::{TimeZone, Utc};
use speculate2::speculate;
use stitchcraft::db::Database;
use stitchcraft::engine::{groups, PatternError};
use stitchcraft::models::*;
use uuid::Uuid;

fn create_test_profile(db: &Database, email: &str) -> Profile {
    db.create_profile(CreateProfileInput {
        email: email.to_string(),
        display_name: None,
    })
    .expect("Failed to create profile")
}

fn pattern_input(owner_id: Uuid, name: &str) -> CreatePatternInput {
    CreatePatternInput {
        owner_id,
        name: name.to_string(),
        description: String::new(),
        difficulty: Difficulty::Beginner,
        hook_size: "3.5 mm".to_string(),
        yarn_weight: "DK".to_string(),
        gauge: None,
        materials: vec![],
        sections: vec![],
        notes: vec![],
    }
}

fn free_pattern_input(title: &str, designer: &str, tags: &[&str]) -> CreateFreePatternInput {
    CreateFreePatternInput {
        title: title.to_string(),
        designer: designer.to_string(),
        url: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
        difficulty: Difficulty::Beginner,
        description: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "migrations" {
        it "can run twice" {
            db.migrate().expect("Second migration run failed");
        }
    }

    describe "profiles" {
        describe "create_profile" {
            it "normalizes the email and starts on the free tier" {
                let profile = db.create_profile(CreateProfileInput {
                    email: "  Ada@Example.COM ".to_string(),
                    display_name: Some("Ada".to_string()),
                }).expect("Failed to create profile");

                assert_eq!(profile.email, "ada@example.com");
                assert_eq!(profile.display_name, Some("Ada".to_string()));
                assert_eq!(profile.subscription.tier, SubscriptionTier::Free);
                assert!(!profile.subscription.is_active());
            }

            it "rejects an empty email" {
                let result = db.create_profile(CreateProfileInput {
                    email: "   ".to_string(),
                    display_name: None,
                });
                assert!(result.is_err());
            }

            it "rejects a duplicate email regardless of case" {
                create_test_profile(&db, "ada@example.com");
                let result = db.create_profile(CreateProfileInput {
                    email: "ADA@example.com".to_string(),
                    display_name: None,
                });

                let err = result.unwrap_err().to_string();
                assert!(err.contains("already exists"));
            }

            it "lets exactly one of several racing inserts win" {
                let racers: Vec<_> = (0..8)
                    .map(|_| {
                        let db = db.clone();
                        std::thread::spawn(move || {
                            db.create_profile(CreateProfileInput {
                                email: "race@example.com".to_string(),
                                display_name: None,
                            })
                        })
                    })
                    .collect();
                let results: Vec<_> = racers.into_iter().map(|r| r.join().unwrap()).collect();

                assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
                for err in results.iter().filter_map(|r| r.as_ref().err()) {
                    assert_eq!(err.to_string(), "Profile already exists for race@example.com");
                }
            }
        }

        describe "get_all_profiles" {
            it "orders profiles by email" {
                create_test_profile(&db, "zed@example.com");
                create_test_profile(&db, "amy@example.com");

                let profiles = db.get_all_profiles().expect("Query failed");
                let emails: Vec<_> = profiles.iter().map(|p| p.email.as_str()).collect();
                assert_eq!(emails, vec!["amy@example.com", "zed@example.com"]);
            }
        }

        describe "apply_billing_event" {
            it "stores the new subscription state" {
                let profile = create_test_profile(&db, "ada@example.com");
                let period_end = Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap();

                let updated = db.apply_billing_event(&BillingEvent {
                    profile_id: profile.id,
                    tier: SubscriptionTier::Pro,
                    state: SubscriptionState::Active,
                    current_period_end: Some(period_end),
                }).expect("Update failed").expect("Profile missing");

                assert_eq!(updated.subscription.tier, SubscriptionTier::Pro);
                assert_eq!(updated.subscription.state, SubscriptionState::Active);
                assert_eq!(updated.subscription.current_period_end, Some(period_end));
                assert!(updated.subscription.is_active());

                let stored = db.get_profile(profile.id).unwrap().unwrap();
                assert_eq!(stored.subscription, updated.subscription);
            }

            it "returns None for an unknown profile" {
                let result = db.apply_billing_event(&BillingEvent {
                    profile_id: Uuid::new_v4(),
                    tier: SubscriptionTier::Pro,
                    state: SubscriptionState::Active,
                    current_period_end: None,
                }).expect("Update failed");
                assert!(result.is_none());
            }
        }
    }

    describe "custom_stitches" {
        it "saves labels per profile ordered by label" {
            let profile = create_test_profile(&db, "ada@example.com");
            db.add_custom_stitch(profile.id, CreateCustomStitchInput { label: "puff".to_string() }).unwrap();
            db.add_custom_stitch(profile.id, CreateCustomStitchInput { label: "bobble".to_string() }).unwrap();

            let labels: Vec<_> = db.get_custom_stitches(profile.id).unwrap()
                .into_iter()
                .map(|s| s.label)
                .collect();
            assert_eq!(labels, vec!["bobble", "puff"]);
        }

        it "returns the stored entry for a repeated label" {
            let profile = create_test_profile(&db, "ada@example.com");
            let first = db.add_custom_stitch(profile.id, CreateCustomStitchInput { label: "puff".to_string() }).unwrap();
            let second = db.add_custom_stitch(profile.id, CreateCustomStitchInput { label: " puff ".to_string() }).unwrap();

            assert_eq!(first.id, second.id);
            assert_eq!(db.get_custom_stitches(profile.id).unwrap().len(), 1);
        }

        it "rejects built-in abbreviations" {
            let profile = create_test_profile(&db, "ada@example.com");
            let err = db.add_custom_stitch(profile.id, CreateCustomStitchInput { label: "SC".to_string() })
                .unwrap_err()
                .to_string();
            assert!(err.contains("built-in"));
        }

        it "requires an existing profile" {
            let result = db.add_custom_stitch(Uuid::new_v4(), CreateCustomStitchInput { label: "puff".to_string() });
            assert!(result.is_err());
        }
    }

    describe "patterns" {
        describe "create_pattern" {
            it "stores sections and metadata" {
                let owner = create_test_profile(&db, "ada@example.com");
                let mut input = pattern_input(owner.id, "Amigurumi Bear");
                input.materials = vec!["Stuffing".to_string()];
                input.sections = vec![Section::new("Head", vec![
                    Round::new(vec![Stitch::new(StitchKind::SingleCrochet, 6)]),
                ])];

                let pattern = db.create_pattern(input).expect("Failed to create pattern");
                let stored = db.get_pattern(pattern.id).unwrap().expect("Pattern missing");

                assert_eq!(stored, pattern);
                assert_eq!(stored.sections[0].rounds[0].stitches[0].kind, StitchKind::SingleCrochet);
            }

            it "requires a name" {
                let owner = create_test_profile(&db, "ada@example.com");
                let result = db.create_pattern(pattern_input(owner.id, "  "));
                assert!(result.is_err());
            }

            it "requires an existing owner" {
                let err = db.create_pattern(pattern_input(Uuid::new_v4(), "Orphan"))
                    .unwrap_err()
                    .to_string();
                assert!(err.contains("Profile not found"));
            }

            it "drops undersized groups before saving" {
                let owner = create_test_profile(&db, "ada@example.com");
                let sc = Stitch::new(StitchKind::SingleCrochet, 2);
                let mut round = Round::new(vec![sc.clone()]);
                round.groups.push(RepetitionGroup {
                    id: Uuid::new_v4(),
                    stitch_ids: vec![sc.id, Uuid::new_v4()],
                    count: 3,
                });
                let mut input = pattern_input(owner.id, "Stale Groups");
                input.sections = vec![Section::new("Body", vec![round])];

                let pattern = db.create_pattern(input).unwrap();
                assert!(pattern.sections[0].rounds[0].groups.is_empty());
            }
        }

        describe "get_patterns" {
            it "filters by owner and difficulty" {
                let ada = create_test_profile(&db, "ada@example.com");
                let bo = create_test_profile(&db, "bo@example.com");
                db.create_pattern(pattern_input(ada.id, "Coaster")).unwrap();
                let mut hard = pattern_input(ada.id, "Lace Shawl");
                hard.difficulty = Difficulty::Advanced;
                db.create_pattern(hard).unwrap();
                db.create_pattern(pattern_input(bo.id, "Scarf")).unwrap();

                let mine = db.get_patterns(&ListPatternsQuery {
                    owner_id: Some(ada.id),
                    ..Default::default()
                }).unwrap();
                assert_eq!(mine.len(), 2);

                let advanced = db.get_patterns(&ListPatternsQuery {
                    difficulty: Some(Difficulty::Advanced),
                    ..Default::default()
                }).unwrap();
                assert_eq!(advanced.len(), 1);
                assert_eq!(advanced[0].name, "Lace Shawl");
            }

            it "pages with limit and offset" {
                let owner = create_test_profile(&db, "ada@example.com");
                for name in ["A", "B", "C"] {
                    db.create_pattern(pattern_input(owner.id, name)).unwrap();
                }

                let page = db.get_patterns(&ListPatternsQuery {
                    limit: Some(2),
                    offset: Some(2),
                    ..Default::default()
                }).unwrap();
                assert_eq!(page.len(), 1);
            }
        }

        describe "update_pattern" {
            it "changes only the provided fields" {
                let owner = create_test_profile(&db, "ada@example.com");
                let pattern = db.create_pattern(pattern_input(owner.id, "Draft")).unwrap();

                let updated = db.update_pattern(pattern.id, UpdatePatternInput {
                    name: Some("Final".to_string()),
                    ..Default::default()
                }).unwrap().expect("Pattern missing");

                assert_eq!(updated.name, "Final");
                assert_eq!(updated.hook_size, "3.5 mm");
                assert_eq!(updated.created_at, pattern.created_at);
                assert!(updated.updated_at >= pattern.updated_at);
            }

            it "returns None for an unknown pattern" {
                let result = db.update_pattern(Uuid::new_v4(), UpdatePatternInput::default()).unwrap();
                assert!(result.is_none());
            }
        }

        describe "modify_sections" {
            before {
                let owner = create_test_profile(&db, "ada@example.com");
                let mut input = pattern_input(owner.id, "Ripple");
                input.sections = vec![Section::new("Body", vec![Round::new(
                    (0..24).map(|_| Stitch::new(StitchKind::SingleCrochet, 1)).collect(),
                )])];
                let pattern = db.create_pattern(input).unwrap();
                let round_id = pattern.sections[0].rounds[0].id;
            }

            it "keeps every edit made from parallel threads" {
                let workers: Vec<_> = pattern.sections[0].rounds[0]
                    .stitches
                    .iter()
                    .map(|stitch| {
                        let db = db.clone();
                        let (pattern_id, stitch_id) = (pattern.id, stitch.id);
                        std::thread::spawn(move || {
                            db.modify_sections(pattern_id, |sections| {
                                let round = groups::find_round_mut(sections, round_id)?;
                                Ok(groups::remove_stitch(round, stitch_id))
                            })
                        })
                    })
                    .collect();
                let renamer = {
                    let db = db.clone();
                    let id = pattern.id;
                    std::thread::spawn(move || {
                        db.update_pattern(id, UpdatePatternInput {
                            name: Some("Ripple Blanket".to_string()),
                            ..Default::default()
                        })
                    })
                };

                for worker in workers {
                    let (_, removed) = worker.join().unwrap().unwrap().expect("Pattern missing");
                    assert!(removed);
                }
                renamer.join().unwrap().unwrap().expect("Pattern missing");

                let saved = db.get_pattern(pattern.id).unwrap().unwrap();
                assert!(saved.sections[0].rounds[0].stitches.is_empty());
                assert_eq!(saved.name, "Ripple Blanket");
            }

            it "writes nothing when the edit fails" {
                let missing = Uuid::new_v4();
                let err = db.modify_sections(pattern.id, |sections| {
                    sections[0].rounds[0].stitches.clear();
                    Err::<(), _>(PatternError::StitchNotFound(missing))
                }).unwrap_err();

                assert_eq!(
                    err.downcast::<PatternError>().unwrap(),
                    PatternError::StitchNotFound(missing)
                );
                let saved = db.get_pattern(pattern.id).unwrap().unwrap();
                assert_eq!(saved, pattern);
            }

            it "returns None for an unknown pattern" {
                let result = db.modify_sections(Uuid::new_v4(), |_| Ok(())).unwrap();
                assert!(result.is_none());
            }
        }

        describe "delete_pattern" {
            it "removes the pattern" {
                let owner = create_test_profile(&db, "ada@example.com");
                let pattern = db.create_pattern(pattern_input(owner.id, "Gone")).unwrap();

                assert!(db.delete_pattern(pattern.id).unwrap());
                assert!(db.get_pattern(pattern.id).unwrap().is_none());
                assert!(!db.delete_pattern(pattern.id).unwrap());
            }
        }
    }

    describe "free_patterns" {
        it "searches title, designer and tags" {
            db.create_free_pattern(free_pattern_input("Granny Square", "Hook House", &["blanket"])).unwrap();
            db.create_free_pattern(free_pattern_input("Tiny Whale", "Sea Stitches", &["amigurumi"])).unwrap();

            let by_title = db.search_free_patterns(&FreePatternQuery {
                q: Some("granny".to_string()),
                ..Default::default()
            }).unwrap();
            assert_eq!(by_title.len(), 1);

            let by_tag = db.search_free_patterns(&FreePatternQuery {
                q: Some("AMIGURUMI".to_string()),
                ..Default::default()
            }).unwrap();
            assert_eq!(by_tag[0].title, "Tiny Whale");

            let all = db.search_free_patterns(&FreePatternQuery::default()).unwrap();
            let titles: Vec<_> = all.iter().map(|p| p.title.as_str()).collect();
            assert_eq!(titles, vec!["Granny Square", "Tiny Whale"]);
        }

        it "filters by difficulty" {
            let mut hard = free_pattern_input("Filet Table Runner", "Old Lace", &[]);
            hard.difficulty = Difficulty::Advanced;
            db.create_free_pattern(hard).unwrap();
            db.create_free_pattern(free_pattern_input("Dishcloth", "Hook House", &[])).unwrap();

            let results = db.search_free_patterns(&FreePatternQuery {
                difficulty: Some(Difficulty::Advanced),
                ..Default::default()
            }).unwrap();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].title, "Filet Table Runner");
        }

        it "requires a title and url" {
            let mut input = free_pattern_input("Nameless", "Nobody", &[]);
            input.url = String::new();
            assert!(db.create_free_pattern(input).is_err());
        }
    }
}
