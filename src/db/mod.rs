mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::*;

const ITEM_COLUMNS: &str = "id, project_id, title, description, priority, status, sprint_tag, \
     assigned_to, created_by_role, version, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, name, description, anthropic_api_key, telegram_bot_token, \
     telegram_chat_id, created_at, updated_at";

/// A status write to apply atomically, together with the records that must
/// land with it.
///
/// The write only happens if the item is still at `expected_version`.
#[derive(Debug, Clone)]
pub struct StatusCommit {
    pub item_id: Uuid,
    pub expected_version: i64,
    pub to: ItemStatus,
    pub role: Role,
    pub comment: Option<String>,
    pub decision: Option<CreateDecisionLogInput>,
    /// New assignee, written only if the version check passes. `None`
    /// leaves the assignee unchanged.
    pub assignee: Option<String>,
}

/// What a successful [`StatusCommit`] wrote.
#[derive(Debug, Clone)]
pub struct CommittedTransition {
    pub item: Item,
    pub comment: Option<Comment>,
    pub decision: Option<DecisionLog>,
}

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

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "agentboard")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("agentboard.db");
        Self::open(db_path)
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
        let applied = schema::run_migrations(&conn)?;
        if applied > 0 {
            tracing::debug!(applied, "Database schema up to date");
        }
        Ok(())
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY rowid"
        ))?;

        let projects = stmt
            .query_map([], map_project)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let project = conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"),
                [id.to_string()],
                map_project,
            )
            .optional()?;
        Ok(project)
    }

    /// Create a project and mint one API key per role.
    pub fn create_project(&self, input: CreateProjectInput) -> Result<CreateProjectResponse> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        tx.execute(
            "INSERT INTO projects (id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.description,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        let mut api_keys = Vec::new();
        for role in Role::ALL {
            let key = ApiKey {
                id: Uuid::new_v4(),
                project_id: id,
                role,
                key: Uuid::new_v4().simple().to_string(),
                name: Some(format!("{} key", role)),
                created_at: now,
            };
            tx.execute(
                "INSERT INTO api_keys (id, project_id, role, key, name, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    key.id.to_string(),
                    id.to_string(),
                    role.as_str(),
                    &key.key,
                    &key.name,
                    now.to_rfc3339(),
                ),
            )?;
            api_keys.push(key);
        }

        tx.commit()?;

        Ok(CreateProjectResponse {
            project: Project {
                id,
                name: input.name,
                description: input.description,
                anthropic_api_key: None,
                telegram_bot_token: None,
                telegram_chat_id: None,
                created_at: now,
                updated_at: now,
            },
            api_keys,
        })
    }

    pub fn update_project_credentials(
        &self,
        id: Uuid,
        input: UpdateCredentialsInput,
    ) -> Result<Option<Project>> {
        let Some(existing) = self.get_project(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let anthropic_api_key =
            merge_credential(input.anthropic_api_key, existing.anthropic_api_key);
        let telegram_bot_token =
            merge_credential(input.telegram_bot_token, existing.telegram_bot_token);
        let telegram_chat_id = merge_credential(input.telegram_chat_id, existing.telegram_chat_id);

        conn.execute(
            "UPDATE projects SET anthropic_api_key = ?, telegram_bot_token = ?, telegram_chat_id = ?, updated_at = ?
             WHERE id = ?",
            (
                &anthropic_api_key,
                &telegram_bot_token,
                &telegram_chat_id,
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(Project {
            anthropic_api_key,
            telegram_bot_token,
            telegram_chat_id,
            updated_at: now,
            ..existing
        }))
    }

    // ============================================================
    // API key operations
    // ============================================================

    pub fn get_api_keys(&self, project_id: Uuid) -> Result<Vec<ApiKey>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, role, key, name, created_at
             FROM api_keys WHERE project_id = ? ORDER BY rowid",
        )?;

        let keys = stmt
            .query_map([project_id.to_string()], map_api_key)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(keys)
    }

    /// Look up the project and role an API key acts for.
    pub fn resolve_api_key(&self, key: &str) -> Result<Option<ApiKey>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let found = conn
            .query_row(
                "SELECT id, project_id, role, key, name, created_at FROM api_keys WHERE key = ?",
                [key],
                map_api_key,
            )
            .optional()?;
        Ok(found)
    }

    // ============================================================
    // Item operations
    // ============================================================

    pub fn create_item(&self, project_id: Uuid, role: Role, input: CreateItemInput) -> Result<Item> {
        self.get_project(project_id)?
            .ok_or_else(|| anyhow::anyhow!("Project not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let priority = input.priority.unwrap_or_default();

        conn.execute(
            "INSERT INTO items (id, project_id, title, description, priority, status, sprint_tag, created_by_role, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 'draft', ?, ?, 0, ?, ?)",
            (
                id.to_string(),
                project_id.to_string(),
                &input.title,
                &input.description,
                priority.as_str(),
                &input.sprint_tag,
                role.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Item {
            id,
            project_id,
            title: input.title,
            description: input.description,
            priority,
            status: ItemStatus::Draft,
            sprint_tag: input.sprint_tag,
            assigned_to: None,
            created_by_role: Some(role),
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        query_item(&conn, id)
    }

    /// List a project's items in creation order, optionally filtered.
    pub fn list_items(&self, project_id: Uuid, filter: &ItemFilter) -> Result<Vec<Item>> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let mut clauses = vec!["project_id = ?"];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(project_id.to_string())];

        if let Some(status) = filter.status {
            clauses.push("status = ?");
            params.push(Box::new(status.as_str()));
        }
        if let Some(priority) = filter.priority {
            clauses.push("priority = ?");
            params.push(Box::new(priority.as_str()));
        }
        if let Some(sprint_tag) = &filter.sprint_tag {
            clauses.push("sprint_tag = ?");
            params.push(Box::new(sprint_tag.clone()));
        }

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE {} ORDER BY rowid",
            clauses.join(" AND ")
        );
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_ref.as_slice(), map_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn list_items_by_project_and_status(
        &self,
        project_id: Uuid,
        status: ItemStatus,
    ) -> Result<Vec<Item>> {
        self.list_items(
            project_id,
            &ItemFilter {
                status: Some(status),
                ..Default::default()
            },
        )
    }

    /// Compare-and-set the status of an item.
    ///
    /// Returns `false` without writing when the item is missing or its
    /// version no longer matches `expected_version`.
    pub fn update_item_status(
        &self,
        id: Uuid,
        status: ItemStatus,
        expected_version: i64,
    ) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        compare_and_set_status(&conn, id, status, expected_version)
    }

    /// Apply a status write plus its attached comment and decision log in a
    /// single transaction. Returns `None` when the version check fails, in
    /// which case nothing is written.
    pub fn commit_transition(&self, commit: StatusCommit) -> Result<Option<CommittedTransition>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        if !compare_and_set_status(&tx, commit.item_id, commit.to, commit.expected_version)? {
            return Ok(None);
        }

        if let Some(assignee) = &commit.assignee {
            tx.execute(
                "UPDATE items SET assigned_to = ? WHERE id = ?",
                (assignee, commit.item_id.to_string()),
            )?;
        }

        let comment = commit
            .comment
            .map(|content| insert_comment(&tx, commit.item_id, content, commit.role))
            .transpose()?;

        let decision = commit
            .decision
            .map(|input| insert_decision_log(&tx, commit.item_id, commit.role, input))
            .transpose()?;

        let item = query_item(&tx, commit.item_id)?
            .ok_or_else(|| anyhow::anyhow!("Item not found"))?;

        tx.commit()?;

        Ok(Some(CommittedTransition {
            item,
            comment,
            decision,
        }))
    }

    pub fn get_item_context(&self, id: Uuid) -> Result<Option<ItemContext>> {
        let Some(item) = self.get_item(id)? else {
            return Ok(None);
        };

        let mut dependencies = Vec::new();
        for dep in self.list_dependencies(id)? {
            let decision_logs = self.list_decision_logs(dep.id)?;
            dependencies.push(DependencyContext {
                item: dep,
                decision_logs,
            });
        }

        Ok(Some(ItemContext {
            item,
            dependencies,
            comments: self.list_comments(id)?,
            decision_logs: self.list_decision_logs(id)?,
        }))
    }

    // ============================================================
    // Dependency operations
    // ============================================================

    pub fn add_dependency(&self, item_id: Uuid, depends_on_item_id: Uuid) -> Result<Dependency> {
        if item_id == depends_on_item_id {
            anyhow::bail!("Item cannot depend on itself");
        }

        let item = self
            .get_item(item_id)?
            .ok_or_else(|| anyhow::anyhow!("Item not found"))?;
        let depends_on = self
            .get_item(depends_on_item_id)?
            .ok_or_else(|| anyhow::anyhow!("Dependency item not found"))?;

        if item.project_id != depends_on.project_id {
            anyhow::bail!("Dependency item not found in this project");
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT OR IGNORE INTO dependencies (item_id, depends_on_item_id) VALUES (?, ?)",
            (item_id.to_string(), depends_on_item_id.to_string()),
        )?;

        Ok(Dependency {
            item_id,
            depends_on_item_id,
        })
    }

    pub fn remove_dependency(&self, item_id: Uuid, depends_on_item_id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM dependencies WHERE item_id = ? AND depends_on_item_id = ?",
            (item_id.to_string(), depends_on_item_id.to_string()),
        )?;
        Ok(rows > 0)
    }

    /// The items `item_id` depends on, with their current status.
    pub fn list_dependencies(&self, item_id: Uuid) -> Result<Vec<DependencyStatus>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT i.id, i.title, i.status
             FROM dependencies d JOIN items i ON i.id = d.depends_on_item_id
             WHERE d.item_id = ? ORDER BY d.rowid",
        )?;

        let deps = stmt
            .query_map([item_id.to_string()], |row| {
                Ok(DependencyStatus {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    title: row.get(1)?,
                    status: ItemStatus::from_str(&row.get::<_, String>(2)?)
                        .unwrap_or(ItemStatus::Draft),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(deps)
    }

    // ============================================================
    // Decision log operations
    // ============================================================

    pub fn append_decision_log(
        &self,
        item_id: Uuid,
        role: Role,
        input: CreateDecisionLogInput,
    ) -> Result<DecisionLog> {
        self.get_item(item_id)?
            .ok_or_else(|| anyhow::anyhow!("Item not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        insert_decision_log(&conn, item_id, role, input)
    }

    pub fn list_decision_logs(&self, item_id: Uuid) -> Result<Vec<DecisionLog>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, item_id, context, decision, alternatives, consequences, created_by_role, created_at
             FROM decision_logs WHERE item_id = ? ORDER BY rowid",
        )?;

        let logs = stmt
            .query_map([item_id.to_string()], |row| {
                Ok(DecisionLog {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    item_id: parse_uuid(row.get::<_, String>(1)?),
                    context: row.get(2)?,
                    decision: row.get(3)?,
                    alternatives: row.get(4)?,
                    consequences: row.get(5)?,
                    created_by_role: parse_role(row.get(6)?),
                    created_at: parse_datetime(row.get::<_, String>(7)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(logs)
    }

    pub fn count_decision_logs(&self, item_id: Uuid) -> Result<usize> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM decision_logs WHERE item_id = ?",
            [item_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ============================================================
    // Comment operations
    // ============================================================

    pub fn append_comment(&self, item_id: Uuid, content: String, role: Role) -> Result<Comment> {
        self.get_item(item_id)?
            .ok_or_else(|| anyhow::anyhow!("Item not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        insert_comment(&conn, item_id, content, role)
    }

    pub fn list_comments(&self, item_id: Uuid) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, item_id, content, author_role, created_at
             FROM comments WHERE item_id = ? ORDER BY rowid",
        )?;

        let comments = stmt
            .query_map([item_id.to_string()], |row| {
                Ok(Comment {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    item_id: parse_uuid(row.get::<_, String>(1)?),
                    content: row.get(2)?,
                    author_role: parse_role(row.get(3)?),
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(comments)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

// Helpers below take a bare connection so they can run inside a transaction
// while the lock is already held.

fn query_item(conn: &Connection, id: Uuid) -> Result<Option<Item>> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"),
            [id.to_string()],
            map_item,
        )
        .optional()?;
    Ok(item)
}

fn compare_and_set_status(
    conn: &Connection,
    id: Uuid,
    status: ItemStatus,
    expected_version: i64,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE items SET status = ?, version = version + 1, updated_at = ?
         WHERE id = ? AND version = ?",
        (
            status.as_str(),
            Utc::now().to_rfc3339(),
            id.to_string(),
            expected_version,
        ),
    )?;
    Ok(rows > 0)
}

fn insert_comment(conn: &Connection, item_id: Uuid, content: String, role: Role) -> Result<Comment> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO comments (id, item_id, content, author_role, created_at) VALUES (?, ?, ?, ?, ?)",
        (
            id.to_string(),
            item_id.to_string(),
            &content,
            role.as_str(),
            now.to_rfc3339(),
        ),
    )?;

    Ok(Comment {
        id,
        item_id,
        content,
        author_role: Some(role),
        created_at: now,
    })
}

fn insert_decision_log(
    conn: &Connection,
    item_id: Uuid,
    role: Role,
    input: CreateDecisionLogInput,
) -> Result<DecisionLog> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO decision_logs (id, item_id, context, decision, alternatives, consequences, created_by_role, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        (
            id.to_string(),
            item_id.to_string(),
            &input.context,
            &input.decision,
            &input.alternatives,
            &input.consequences,
            role.as_str(),
            now.to_rfc3339(),
        ),
    )?;

    Ok(DecisionLog {
        id,
        item_id,
        context: input.context,
        decision: input.decision,
        alternatives: input.alternatives,
        consequences: input.consequences,
        created_by_role: Some(role),
        created_at: now,
    })
}

fn map_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: parse_uuid(row.get::<_, String>(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        priority: Priority::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        status: ItemStatus::from_str(&row.get::<_, String>(5)?).unwrap_or(ItemStatus::Draft),
        sprint_tag: row.get(6)?,
        assigned_to: row.get(7)?,
        created_by_role: parse_role(row.get(8)?),
        version: row.get(9)?,
        created_at: parse_datetime(row.get::<_, String>(10)?),
        updated_at: parse_datetime(row.get::<_, String>(11)?),
    })
}

/// An absent update keeps the stored value; a blank one clears it.
fn merge_credential(update: Option<String>, existing: Option<String>) -> Option<String> {
    match update {
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(value),
        None => existing,
    }
}

fn map_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        anthropic_api_key: row.get(3)?,
        telegram_bot_token: row.get(4)?,
        telegram_chat_id: row.get(5)?,
        created_at: parse_datetime(row.get::<_, String>(6)?),
        updated_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

fn map_api_key(row: &Row<'_>) -> rusqlite::Result<ApiKey> {
    Ok(ApiKey {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: parse_uuid(row.get::<_, String>(1)?),
        role: Role::from_str(&row.get::<_, String>(2)?).unwrap_or(Role::Planner),
        key: row.get(3)?,
        name: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_role(s: Option<String>) -> Option<Role> {
    s.as_deref().and_then(Role::from_str)
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
