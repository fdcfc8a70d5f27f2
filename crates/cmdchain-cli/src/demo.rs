//! The demo command set served by the CLI.
//!
//! Commands:
//! - `echo <message...>`
//! - `calc add <a> <b>` (integer and decimal overloads), `calc neg <x>`
//! - `perm grant|revoke user <name> <node>`, `perm list <name>` (alias `permission`)
//! - `find users <search...>` over a small in-memory user table
//! - `sql <search...>` prints the SQL the search lowers to

use crate::sql::SqlBackend;
use anyhow::Result;
use cmdchain_core::arguments::{integer, number, remainder, text};
use cmdchain_core::search::handlers::{contains, equals, flag, member, numeric};
use cmdchain_core::search::{MemoryBackend, PredicateBackend, Record, Value};
use cmdchain_core::{
    Command, CommandError, CommandSender, Dispatcher, FrameworkConfig, Grants, PermissionNodes, Router, SearchHandlers,
};
use colored::Colorize;
use std::sync::Arc;

/// Sender granted every demo node at startup.
pub const OPERATOR: &str = "console";

/// Node guarding the `perm` router.
pub const PERM_NODE: &str = "cmdchain.perm";

/// Sender that prints replies to stdout.
pub struct ConsoleSender {
    name: String,
}

impl ConsoleSender {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl CommandSender for ConsoleSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_message(&self, message: &str) {
        println!("{message}");
    }
}

pub struct Demo {
    pub dispatcher: Dispatcher,
    pub handlers: Arc<SearchHandlers>,
    pub users: MemoryBackend,
}

fn user(id: i64, name: &str, age: i64, role: &str, active: bool) -> Record {
    Record::from([
        ("id".to_string(), Value::Integer(id)),
        ("name".to_string(), Value::from(name)),
        ("age".to_string(), Value::Integer(age)),
        ("role".to_string(), Value::from(role)),
        ("active".to_string(), Value::Bool(active)),
    ])
}

fn membership(user_id: i64, group: &str) -> Record {
    Record::from([
        ("user_id".to_string(), Value::Integer(user_id)),
        ("group".to_string(), Value::from(group)),
    ])
}

pub fn users() -> MemoryBackend {
    MemoryBackend::new(vec![
        user(1, "John Doe", 34, "admin", true),
        user(2, "Jane Doe", 28, "member", false),
        user(3, "Max Power", 51, "member", true),
        user(4, "Ada Lovelace", 36, "moderator", true),
        user(5, "Bob Builder", 19, "member", true),
    ])
    .with_table(
        "memberships",
        vec![
            membership(1, "staff"),
            membership(4, "staff"),
            membership(2, "guests"),
            membership(5, "guests"),
        ],
    )
}

/// Search vocabulary for the user table.
pub fn user_handlers() -> Result<Arc<SearchHandlers>> {
    let handlers = SearchHandlers::new();
    handlers.register_handler("name", equals("name"))?;
    handlers.register_handler("age", numeric("age"))?;
    handlers.register_handler("role", equals("role"))?;
    handlers.register_handler("group", member("id", "memberships", "user_id", equals("group")))?;
    handlers.register_command("active", flag("active", true))?;
    handlers.register_command("admin", flag("role", "admin"))?;
    handlers.register_string_handler(contains("name"));
    Ok(Arc::new(handlers))
}

/// Build the dispatcher. `operator` starts out holding every demo node.
pub fn build(config: FrameworkConfig, operator: &str) -> Result<Demo> {
    let nodes = PermissionNodes::new();
    let grants = Arc::new(Grants::new());
    grants.grant(operator, "cmdchain.*");

    let root = Arc::new(config.router().with_permission_check(grants.clone()));
    let dispatcher = Dispatcher::new(config, Arc::clone(&root));
    let handlers = user_handlers()?;
    let users = users();

    root.register_command(
        Command::builder("echo")
            .description("Repeat a message")
            .overload(vec![remainder("message")], |inv| {
                inv.reply(inv.arguments.text(0)?);
                Ok(())
            })
            .build()?,
    )?;

    root.register_command(
        Command::builder("calc")
            .description("Small arithmetic")
            .overload(vec![dispatcher.label("add"), integer("a"), integer("b")], |inv| {
                let (a, b) = (inv.arguments.integer(0)?, inv.arguments.integer(1)?);
                let sum = a
                    .checked_add(b)
                    .ok_or_else(|| CommandError::cast(format!("{a} + {b} overflows.")))?;
                inv.reply(sum.to_string());
                Ok(())
            })
            .overload(vec![dispatcher.label("add"), number("a"), number("b")], |inv| {
                inv.reply((inv.arguments.number(0)? + inv.arguments.number(1)?).to_string());
                Ok(())
            })
            .overload(vec![dispatcher.label("neg"), number("x")], |inv| {
                inv.reply((-inv.arguments.number(0)?).to_string());
                Ok(())
            })
            .build()?,
    )?;

    root.register_route("perm", perm_router(&dispatcher, &nodes, &grants)?)?;
    root.alias("permission", "perm")?;

    let table = users.clone();
    root.register_command(
        Command::builder("find")
            .description("Search the user table")
            .overload(
                vec![dispatcher.label("users"), dispatcher.search_variant("query", Arc::clone(&handlers))],
                move |inv| {
                    let compiled = inv.arguments.search(0)?;
                    let rows = table.select(&compiled.tree)?;
                    if rows.is_empty() {
                        inv.reply("No users matched.");
                    }
                    for row in rows {
                        inv.reply(row_name(row));
                    }
                    Ok(())
                },
            )
            .build()?,
    )?;

    root.register_command(
        Command::builder("sql")
            .description("Show the SQL a user search lowers to")
            .overload(vec![dispatcher.search_variant("query", Arc::clone(&handlers))], |inv| {
                let compiled = inv.arguments.search(0)?;
                let lowered = SqlBackend::new().lower(&compiled.tree)?;
                inv.reply(format!("WHERE {}", lowered.clause));
                if !lowered.params.is_empty() {
                    let params: Vec<String> = lowered.params.iter().map(Value::to_string).collect();
                    inv.reply(format!("-- params: {}", params.join(", ")));
                }
                Ok(())
            })
            .build()?,
    )?;

    tracing::debug!(routes = root.labels().len(), "demo commands registered");
    Ok(Demo {
        dispatcher,
        handlers,
        users,
    })
}

fn perm_router(dispatcher: &Dispatcher, nodes: &PermissionNodes, grants: &Arc<Grants>) -> Result<Router> {
    let perm = dispatcher
        .config()
        .router()
        .guarded_by(nodes.intern(PERM_NODE));

    let store = Arc::clone(grants);
    perm.register_command(
        Command::builder("grant")
            .description("Grant a permission node")
            .overload(vec![dispatcher.label("user"), text("name"), text("node")], move |inv| {
                let (name, node) = (inv.arguments.text(0)?, inv.arguments.text(1)?);
                validate_node(node)?;
                store.grant(name, node);
                inv.reply(format!("Granted `{node}` to {name}."));
                Ok(())
            })
            .build()?,
    )?;

    let store = Arc::clone(grants);
    perm.register_command(
        Command::builder("revoke")
            .description("Revoke a permission node")
            .overload(vec![dispatcher.label("user"), text("name"), text("node")], move |inv| {
                let (name, node) = (inv.arguments.text(0)?, inv.arguments.text(1)?);
                if store.revoke(name, node) {
                    inv.reply(format!("Revoked `{node}` from {name}."));
                } else {
                    inv.reply(format!("{name} does not hold `{node}`."));
                }
                Ok(())
            })
            .build()?,
    )?;

    let store = Arc::clone(grants);
    perm.register_command(
        Command::builder("list")
            .description("List granted nodes")
            .overload(vec![text("name")], move |inv| {
                let name = inv.arguments.text(0)?;
                let granted = store.granted(name);
                if granted.is_empty() {
                    inv.reply(format!("{name} holds no permissions."));
                } else {
                    inv.reply(format!("{name}: {}", granted.join(", ")));
                }
                Ok(())
            })
            .build()?,
    )?;
    perm.alias("ls", "list")?;

    perm.set_null_route(
        Command::builder("perm")
            .overload(vec![], |inv| {
                inv.reply(format!("{} <grant|revoke|list> ...", inv.label));
                Ok(())
            })
            .build()?,
    );
    Ok(perm)
}

/// Dotted segments of `[A-Za-z0-9_-]`, or `*`.
fn validate_node(node: &str) -> Result<(), CommandError> {
    let segment_ok =
        |part: &str| part == "*" || (!part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-'));
    if node.split('.').all(segment_ok) {
        Ok(())
    } else {
        Err(CommandError::argument(format!("`{node}` is not a permission node.")))
    }
}

/// One-line summary of a search over the demo users, used by `search --format table`.
pub fn describe_rows(rows: &[&Record]) -> String {
    if rows.is_empty() {
        return "no rows".dimmed().to_string();
    }
    rows.iter().map(|r| row_name(r)).collect::<Vec<_>>().join(", ")
}

fn row_name(row: &Record) -> String {
    match row.get("name") {
        Some(Value::Text(name)) => name.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdchain_core::{ErrorKind, GlyphStyle, RecordingSender};

    fn demo() -> Demo {
        build(
            FrameworkConfig {
                glyphs: GlyphStyle::Plain,
                ..FrameworkConfig::default()
            },
            OPERATOR,
        )
        .unwrap()
    }

    #[test]
    fn calc_picks_integer_then_decimal_overloads() {
        let d = demo();
        let sender = RecordingSender::new("console");
        d.dispatcher.dispatch(&sender, "calc add 2 3").unwrap();
        d.dispatcher.dispatch(&sender, "calc ADD 2.5 3").unwrap();
        d.dispatcher.dispatch(&sender, "calc neg 4").unwrap();
        assert_eq!(sender.take(), vec!["5", "5.5", "-4"]);
    }

    #[test]
    fn perm_is_guarded_and_aliased() {
        let d = demo();
        let op = RecordingSender::new("console");
        d.dispatcher.dispatch(&op, "permission grant user bob chat.read").unwrap();
        d.dispatcher.dispatch(&op, "perm ls bob").unwrap();
        d.dispatcher.dispatch(&op, "perm").unwrap();
        assert_eq!(
            op.take(),
            vec!["Granted `chat.read` to bob.", "bob: chat.read", "perm <grant|revoke|list> ..."]
        );

        let bob = RecordingSender::new("bob");
        let err = d.dispatcher.dispatch(&bob, "perm list bob").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Access);

        let err = d.dispatcher.dispatch(&op, "perm grant user bob bad..node").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        d.dispatcher.dispatch(&op, "perm revoke user bob chat.read").unwrap();
        d.dispatcher.dispatch(&op, "perm list bob").unwrap();
        assert_eq!(op.take(), vec!["Revoked `chat.read` from bob.", "bob holds no permissions."]);
    }

    #[test]
    fn find_filters_the_user_table() {
        let d = demo();
        let sender = RecordingSender::new("console");
        d.dispatcher.dispatch(&sender, "find users group:staff active").unwrap();
        assert_eq!(sender.take(), vec!["John Doe", "Ada Lovelace"]);
        d.dispatcher.dispatch(&sender, r#"find users "doe" | age:<20"#).unwrap();
        assert_eq!(sender.take(), vec!["John Doe", "Jane Doe", "Bob Builder"]);
        d.dispatcher.dispatch(&sender, "find users name:nobody").unwrap();
        assert_eq!(sender.take(), vec!["No users matched."]);
    }

    #[test]
    fn sql_prints_the_lowered_clause() {
        let d = demo();
        let sender = RecordingSender::new("console");
        d.dispatcher.dispatch(&sender, "sql admin !age:>40").unwrap();
        assert_eq!(
            sender.take(),
            vec![r#"WHERE ("role" = ? AND NOT ("age" > ?))"#, r#"-- params: "admin", 40"#]
        );
    }

    #[test]
    fn describe_rows_lists_names() {
        let users = users();
        let rows: Vec<&Record> = users.rows().iter().take(2).collect();
        assert_eq!(describe_rows(&rows), "John Doe, Jane Doe");
    }
}
