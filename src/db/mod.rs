mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, ErrorCode, Row, TransactionBehavior};
use uuid::Uuid;

use crate::engine::groups::prune_groups;
use crate::engine::PatternError;
use crate::models::*;

const PATTERN_COLUMNS: &str = "id, owner_id, name, description, difficulty, hook_size, yarn_weight, gauge, materials, sections, notes, created_at, updated_at";

const PROFILE_COLUMNS: &str = "id, email, display_name, subscription_tier, subscription_state, current_period_end, created_at, updated_at";

const FREE_PATTERN_COLUMNS: &str =
    "id, title, designer, url, difficulty, description, tags, created_at";

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "stitchcraft")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("stitchcraft.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Profile operations
    // ============================================================

    pub fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM profiles WHERE id = ?",
            PROFILE_COLUMNS
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(profile_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_all_profiles(&self) -> Result<Vec<Profile>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM profiles ORDER BY email",
            PROFILE_COLUMNS
        ))?;

        let profiles = stmt
            .query_map([], profile_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(profiles)
    }

    pub fn create_profile(&self, input: CreateProfileInput) -> Result<Profile> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() {
            anyhow::bail!("Email is required");
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let subscription = SubscriptionStatus::default();

        conn.execute(
            "INSERT INTO profiles (id, email, display_name, subscription_tier, subscription_state, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &email,
                &input.display_name,
                subscription.tier.as_str(),
                subscription.state.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                anyhow::anyhow!("Profile already exists for {}", email)
            } else {
                e.into()
            }
        })?;

        Ok(Profile {
            id,
            email,
            display_name: input.display_name,
            subscription,
            created_at: now,
            updated_at: now,
        })
    }

    /// Record a subscription change from the billing provider.
    pub fn apply_billing_event(&self, event: &BillingEvent) -> Result<Option<Profile>> {
        let rows = {
            let conn = self.conn.lock().expect("database lock poisoned");
            conn.execute(
                "UPDATE profiles SET subscription_tier = ?, subscription_state = ?, current_period_end = ?, updated_at = ?
                 WHERE id = ?",
                (
                    event.tier.as_str(),
                    event.state.as_str(),
                    event.current_period_end.map(|t| t.to_rfc3339()),
                    Utc::now().to_rfc3339(),
                    event.profile_id.to_string(),
                ),
            )?
        };

        if rows == 0 {
            return Ok(None);
        }
        self.get_profile(event.profile_id)
    }

    // ============================================================
    // Custom stitch operations
    // ============================================================

    pub fn get_custom_stitches(&self, profile_id: Uuid) -> Result<Vec<CustomStitch>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, profile_id, label, created_at
             FROM custom_stitches WHERE profile_id = ? ORDER BY label",
        )?;

        let stitches = stmt
            .query_map([profile_id.to_string()], custom_stitch_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stitches)
    }

    /// Save a custom stitch label. Saving an existing label returns the
    /// stored entry unchanged.
    pub fn add_custom_stitch(
        &self,
        profile_id: Uuid,
        input: CreateCustomStitchInput,
    ) -> Result<CustomStitch> {
        self.get_profile(profile_id)?
            .ok_or_else(|| anyhow::anyhow!("Profile not found"))?;

        let label = match StitchKind::parse(&input.label) {
            StitchKind::Custom(label) if !label.is_empty() => label,
            StitchKind::Custom(_) => anyhow::bail!("Stitch label is required"),
            builtin => anyhow::bail!("'{}' is a built-in stitch", builtin),
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO custom_stitches (id, profile_id, label, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (profile_id, label) DO NOTHING",
            (
                Uuid::new_v4().to_string(),
                profile_id.to_string(),
                &label,
                Utc::now().to_rfc3339(),
            ),
        )?;

        let stitch = conn.query_row(
            "SELECT id, profile_id, label, created_at
             FROM custom_stitches WHERE profile_id = ? AND label = ?",
            (profile_id.to_string(), &label),
            custom_stitch_from_row,
        )?;
        Ok(stitch)
    }

    // ============================================================
    // Pattern operations
    // ============================================================

    pub fn get_patterns(&self, query: &ListPatternsQuery) -> Result<Vec<Pattern>> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let mut clauses = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(owner_id) = query.owner_id {
            clauses.push("owner_id = ?");
            params.push(Box::new(owner_id.to_string()));
        }
        if let Some(difficulty) = query.difficulty {
            clauses.push("difficulty = ?");
            params.push(Box::new(difficulty.as_str().to_string()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        params.push(Box::new(query.limit.map(i64::from).unwrap_or(-1)));
        params.push(Box::new(i64::from(query.offset.unwrap_or(0))));

        let sql = format!(
            "SELECT {} FROM patterns{} ORDER BY updated_at DESC, name LIMIT ? OFFSET ?",
            PATTERN_COLUMNS, where_clause
        );
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let patterns = stmt
            .query_map(params_ref.as_slice(), pattern_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patterns)
    }

    pub fn get_pattern(&self, id: Uuid) -> Result<Option<Pattern>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        select_pattern(&conn, id)
    }

    pub fn create_pattern(&self, input: CreatePatternInput) -> Result<Pattern> {
        if input.name.trim().is_empty() {
            anyhow::bail!("Pattern name is required");
        }
        self.get_profile(input.owner_id)?
            .ok_or_else(|| anyhow::anyhow!("Profile not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let sections = normalize_sections(input.sections);

        conn.execute(
            &format!(
                "INSERT INTO patterns ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                PATTERN_COLUMNS
            ),
            rusqlite::params![
                id.to_string(),
                input.owner_id.to_string(),
                &input.name,
                &input.description,
                input.difficulty.as_str(),
                &input.hook_size,
                &input.yarn_weight,
                &input.gauge,
                serde_json::to_string(&input.materials)?,
                serde_json::to_string(&sections)?,
                serde_json::to_string(&input.notes)?,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        tracing::debug!(pattern_id = %id, sections = sections.len(), "Created pattern");

        Ok(Pattern {
            id,
            owner_id: input.owner_id,
            name: input.name,
            description: input.description,
            difficulty: input.difficulty,
            hook_size: input.hook_size,
            yarn_weight: input.yarn_weight,
            gauge: input.gauge,
            materials: input.materials,
            sections,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_pattern(&self, id: Uuid, input: UpdatePatternInput) -> Result<Option<Pattern>> {
        if matches!(&input.name, Some(name) if name.trim().is_empty()) {
            anyhow::bail!("Pattern name is required");
        }

        let updated = self.modify_pattern(id, |pattern| {
            if let Some(name) = input.name {
                pattern.name = name;
            }
            if let Some(description) = input.description {
                pattern.description = description;
            }
            if let Some(difficulty) = input.difficulty {
                pattern.difficulty = difficulty;
            }
            if let Some(hook_size) = input.hook_size {
                pattern.hook_size = hook_size;
            }
            if let Some(yarn_weight) = input.yarn_weight {
                pattern.yarn_weight = yarn_weight;
            }
            if let Some(gauge) = input.gauge {
                pattern.gauge = gauge;
            }
            if let Some(materials) = input.materials {
                pattern.materials = materials;
            }
            if let Some(sections) = input.sections {
                pattern.sections = sections;
            }
            if let Some(notes) = input.notes {
                pattern.notes = notes;
            }
            Ok(())
        })?;

        Ok(updated.map(|(pattern, ())| pattern))
    }

    /// Apply a structural edit to a pattern's sections and save the result.
    ///
    /// The read, the edit and the write happen under one lock and one
    /// transaction, so concurrent edits to the same pattern never overwrite
    /// each other. A [`PatternError`] from `edit` aborts without writing and
    /// is returned inside the error (see `anyhow::Error::downcast`).
    /// Returns `None` if the pattern does not exist.
    pub fn modify_sections<T>(
        &self,
        id: Uuid,
        edit: impl FnOnce(&mut Vec<Section>) -> Result<T, PatternError>,
    ) -> Result<Option<(Pattern, T)>> {
        self.modify_pattern(id, |pattern| Ok(edit(&mut pattern.sections)?))
    }

    fn modify_pattern<T>(
        &self,
        id: Uuid,
        edit: impl FnOnce(&mut Pattern) -> Result<T>,
    ) -> Result<Option<(Pattern, T)>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut pattern) = select_pattern(&tx, id)? else {
            return Ok(None);
        };

        let output = edit(&mut pattern)?;
        pattern.sections = normalize_sections(std::mem::take(&mut pattern.sections));
        pattern.updated_at = Utc::now();

        write_pattern(&tx, &pattern)?;
        tx.commit()?;

        Ok(Some((pattern, output)))
    }

    pub fn delete_pattern(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM patterns WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Free pattern directory
    // ============================================================

    pub fn create_free_pattern(&self, input: CreateFreePatternInput) -> Result<FreePattern> {
        if input.title.trim().is_empty() || input.url.trim().is_empty() {
            anyhow::bail!("Title and url are required");
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            &format!(
                "INSERT INTO free_patterns ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                FREE_PATTERN_COLUMNS
            ),
            (
                id.to_string(),
                &input.title,
                &input.designer,
                &input.url,
                input.difficulty.as_str(),
                &input.description,
                serde_json::to_string(&input.tags)?,
                now.to_rfc3339(),
            ),
        )?;

        Ok(FreePattern {
            id,
            title: input.title,
            designer: input.designer,
            url: input.url,
            difficulty: input.difficulty,
            description: input.description,
            tags: input.tags,
            created_at: now,
        })
    }

    pub fn get_free_pattern(&self, id: Uuid) -> Result<Option<FreePattern>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM free_patterns WHERE id = ?",
            FREE_PATTERN_COLUMNS
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(free_pattern_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Browse the directory, ordered by title.
    ///
    /// The text filter matches title, designer and tags case-insensitively.
    pub fn search_free_patterns(&self, query: &FreePatternQuery) -> Result<Vec<FreePattern>> {
        let entries = {
            let conn = self.conn.lock().expect("database lock poisoned");
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM free_patterns ORDER BY title",
                FREE_PATTERN_COLUMNS
            ))?;
            let entries = stmt
                .query_map([], free_pattern_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            entries
        };

        let needle = query
            .q
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        Ok(entries
            .into_iter()
            .filter(|p| query.difficulty.map_or(true, |d| p.difficulty == d))
            .filter(|p| match &needle {
                None => true,
                Some(needle) => {
                    p.title.to_lowercase().contains(needle)
                        || p.designer.to_lowercase().contains(needle)
                        || p.tags.iter().any(|t| t.to_lowercase().contains(needle))
                }
            })
            .collect())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn select_pattern(conn: &Connection, id: Uuid) -> Result<Option<Pattern>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM patterns WHERE id = ?",
        PATTERN_COLUMNS
    ))?;

    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(pattern_from_row(row)?)),
        None => Ok(None),
    }
}

fn write_pattern(conn: &Connection, pattern: &Pattern) -> Result<()> {
    conn.execute(
        "UPDATE patterns SET name = ?, description = ?, difficulty = ?, hook_size = ?, yarn_weight = ?,
            gauge = ?, materials = ?, sections = ?, notes = ?, updated_at = ?
         WHERE id = ?",
        rusqlite::params![
            &pattern.name,
            &pattern.description,
            pattern.difficulty.as_str(),
            &pattern.hook_size,
            &pattern.yarn_weight,
            &pattern.gauge,
            serde_json::to_string(&pattern.materials)?,
            serde_json::to_string(&pattern.sections)?,
            serde_json::to_string(&pattern.notes)?,
            pattern.updated_at.to_rfc3339(),
            pattern.id.to_string(),
        ],
    )?;
    Ok(())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

/// Drop stale group references before anything is persisted.
fn normalize_sections(mut sections: Vec<Section>) -> Vec<Section> {
    for round in sections.iter_mut().flat_map(|s| s.rounds.iter_mut()) {
        prune_groups(round);
    }
    sections
}

fn pattern_from_row(row: &Row<'_>) -> rusqlite::Result<Pattern> {
    Ok(Pattern {
        id: parse_uuid(row.get::<_, String>(0)?),
        owner_id: parse_uuid(row.get::<_, String>(1)?),
        name: row.get(2)?,
        description: row.get(3)?,
        difficulty: Difficulty::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        hook_size: row.get(5)?,
        yarn_weight: row.get(6)?,
        gauge: row.get(7)?,
        materials: parse_json(row.get::<_, String>(8)?),
        sections: parse_json(row.get::<_, String>(9)?),
        notes: parse_json(row.get::<_, String>(10)?),
        created_at: parse_datetime(row.get::<_, String>(11)?),
        updated_at: parse_datetime(row.get::<_, String>(12)?),
    })
}

fn custom_stitch_from_row(row: &Row<'_>) -> rusqlite::Result<CustomStitch> {
    Ok(CustomStitch {
        id: parse_uuid(row.get::<_, String>(0)?),
        profile_id: parse_uuid(row.get::<_, String>(1)?),
        label: row.get(2)?,
        created_at: parse_datetime(row.get::<_, String>(3)?),
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: parse_uuid(row.get::<_, String>(0)?),
        email: row.get(1)?,
        display_name: row.get(2)?,
        subscription: SubscriptionStatus {
            tier: SubscriptionTier::from_str(&row.get::<_, String>(3)?).unwrap_or_default(),
            state: SubscriptionState::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
            current_period_end: row.get::<_, Option<String>>(5)?.map(parse_datetime),
        },
        created_at: parse_datetime(row.get::<_, String>(6)?),
        updated_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

fn free_pattern_from_row(row: &Row<'_>) -> rusqlite::Result<FreePattern> {
    Ok(FreePattern {
        id: parse_uuid(row.get::<_, String>(0)?),
        title: row.get(1)?,
        designer: row.get(2)?,
        url: row.get(3)?,
        difficulty: Difficulty::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        description: row.get(5)?,
        tags: parse_json(row.get::<_, String>(6)?),
        created_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_json<T: serde::de::DeserializeOwned + Default>(s: String) -> T {
    serde_json::from_str(&s).unwrap_or_else(|e| {
        tracing::warn!("Failed to parse stored JSON column: {}", e);
        T::default()
    })
}
