//! Label routing.
//!
//! A [`Router`] maps the first argument (lowercased) to a sub-executor and
//! hands it the remaining arguments. Unknown labels fall through to the
//! default route with the *original* arguments; an empty argument list goes
//! to the null route, else the default route. Routers nest: a router is
//! itself a [`CommandExecutor`].

use crate::command::{Command, CommandExecutor, CommandSender, HelpEntry};
use crate::error::{CommandError, RegistrationError};
use crate::lexer::Token;
use crate::permission::{AllowAll, PermissionCheck, PermissionNode};
use crate::snapshot::Snapshot;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 0.8;

pub type SharedExecutor = Arc<dyn CommandExecutor>;

#[derive(Clone)]
struct Route {
    canonical: String,
    executor: SharedExecutor,
}

#[derive(Clone, Default)]
struct RouteTable {
    routes: BTreeMap<String, Route>,
    default: Option<SharedExecutor>,
    null: Option<SharedExecutor>,
}

pub struct Router {
    table: Snapshot<RouteTable>,
    permissions: Arc<dyn PermissionCheck>,
    permission: Option<PermissionNode>,
    suggestion_threshold: f64,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.load();
        f.debug_struct("Router")
            .field("routes", &table.routes.keys().collect::<Vec<_>>())
            .field("default", &table.default.is_some())
            .field("null", &table.null.is_some())
            .field("permission", &self.permission)
            .finish()
    }
}

fn route_key(label: &str) -> Result<String, RegistrationError> {
    if label.is_empty() || label.chars().any(char::is_whitespace) {
        return Err(RegistrationError::InvalidLabel(label.to_string()));
    }
    Ok(label.to_lowercase())
}

fn join_label(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent} {child}")
    }
}

fn same_executor(a: &SharedExecutor, b: &SharedExecutor) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

impl Router {
    pub fn new() -> Self {
        Self {
            table: Snapshot::default(),
            permissions: Arc::new(AllowAll),
            permission: None,
            suggestion_threshold: DEFAULT_SUGGESTION_THRESHOLD,
        }
    }

    /// Access check applied to every sub-executor that declares a node.
    pub fn with_permission_check(mut self, check: Arc<dyn PermissionCheck>) -> Self {
        self.permissions = check;
        self
    }

    /// Node required to enter this router from its parent.
    pub fn guarded_by(mut self, node: PermissionNode) -> Self {
        self.permission = Some(node);
        self
    }

    pub fn with_suggestion_threshold(mut self, threshold: f64) -> Self {
        self.suggestion_threshold = threshold;
        self
    }

    pub fn register_route(&self, label: &str, executor: impl CommandExecutor + 'static) -> Result<(), RegistrationError> {
        self.register_shared(label, Arc::new(executor))
    }

    /// Register a command under its own name.
    pub fn register_command(&self, command: Command) -> Result<(), RegistrationError> {
        let name = command.name().to_string();
        self.register_route(&name, command)
    }

    pub fn register_shared(&self, label: &str, executor: SharedExecutor) -> Result<(), RegistrationError> {
        let key = route_key(label)?;
        self.table.try_update(|table| {
            if table.routes.contains_key(&key) {
                return Err(RegistrationError::DuplicateRoute(label.to_string()));
            }
            tracing::debug!(label = %key, "registered route");
            table.routes.insert(
                key.clone(),
                Route {
                    canonical: key,
                    executor,
                },
            );
            Ok(())
        })
    }

    /// Make `alias` dispatch to the same executor as `canonical`.
    pub fn alias(&self, alias: &str, canonical: &str) -> Result<(), RegistrationError> {
        let key = route_key(alias)?;
        let target = canonical.to_lowercase();
        self.table.try_update(|table| {
            if table.routes.contains_key(&key) {
                return Err(RegistrationError::DuplicateRoute(alias.to_string()));
            }
            let route = table
                .routes
                .get(&target)
                .cloned()
                .ok_or_else(|| RegistrationError::UnknownRoute(canonical.to_string()))?;
            table.routes.insert(key, route);
            Ok(())
        })
    }

    pub fn set_default_route(&self, executor: impl CommandExecutor + 'static) {
        let executor: SharedExecutor = Arc::new(executor);
        self.table.update(|table| table.default = Some(executor));
    }

    pub fn set_null_route(&self, executor: impl CommandExecutor + 'static) {
        let executor: SharedExecutor = Arc::new(executor);
        self.table.update(|table| table.null = Some(executor));
    }

    pub fn clear_default_route(&self) -> bool {
        self.table.update(|table| table.default.take().is_some())
    }

    pub fn clear_null_route(&self) -> bool {
        self.table.update(|table| table.null.take().is_some())
    }

    /// Remove a label. Removing a canonical label also removes its aliases.
    pub fn unregister_route(&self, label: &str) -> Result<(), RegistrationError> {
        let key = label.to_lowercase();
        self.table.try_update(|table| {
            let route = table
                .routes
                .remove(&key)
                .ok_or_else(|| RegistrationError::UnknownRoute(label.to_string()))?;
            if route.canonical == key {
                table.routes.retain(|_, r| r.canonical != key);
            }
            Ok(())
        })
    }

    /// Every registered label, aliases included, sorted.
    pub fn labels(&self) -> Vec<String> {
        self.table.load().routes.keys().cloned().collect()
    }

    /// The canonical label `label` resolves to.
    pub fn canonical(&self, label: &str) -> Option<String> {
        self.table
            .load()
            .routes
            .get(&label.to_lowercase())
            .map(|r| r.canonical.clone())
    }

    fn invoke(
        &self,
        executor: &SharedExecutor,
        sender: &dyn CommandSender,
        label: &str,
        args: &[Token],
    ) -> Result<(), CommandError> {
        if let Some(node) = executor.permission() {
            if !self.permissions.has_permission(sender, node) {
                tracing::debug!(label, sender = sender.name(), node = %node, "permission denied");
                return Err(CommandError::access(format!(
                    "You do not have permission to use `{label}`."
                )));
            }
        }
        executor.execute(sender, label, args)
    }

    fn visible(&self, sender: &dyn CommandSender, executor: &SharedExecutor) -> bool {
        executor
            .permission()
            .map_or(true, |node| self.permissions.has_permission(sender, node))
    }

    fn suggest(&self, table: &RouteTable, typed: &str) -> Option<String> {
        table
            .routes
            .keys()
            .map(|k| (strsim::jaro_winkler(typed, k), k))
            .filter(|(score, _)| *score >= self.suggestion_threshold)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, k)| k.clone())
    }

    fn not_found(&self, table: &RouteTable, label: &str, typed: &str) -> CommandError {
        let what = if label.is_empty() {
            format!("Unknown command `{typed}`.")
        } else {
            format!("Unknown subcommand `{typed}` for `{label}`.")
        };
        match self.suggest(table, &typed.to_lowercase()) {
            Some(hint) => CommandError::not_found(format!("{what} Did you mean `{hint}`?")),
            None => CommandError::not_found(what),
        }
    }

    /// Help for one sub-label. Aliases report the canonical label.
    pub fn help_for(&self, sender: &dyn CommandSender, label: &str, sub: &str) -> Result<Vec<HelpEntry>, CommandError> {
        let table = self.table.load();
        let route = table
            .routes
            .get(&sub.to_lowercase())
            .ok_or_else(|| self.not_found(&table, label, sub))?;
        if !self.visible(sender, &route.executor) {
            return Err(CommandError::access(format!(
                "You do not have permission to use `{}`.",
                join_label(label, &route.canonical)
            )));
        }
        route.executor.help(sender, &join_label(label, &route.canonical))
    }
}

impl CommandExecutor for Router {
    fn execute(&self, sender: &dyn CommandSender, label: &str, args: &[Token]) -> Result<(), CommandError> {
        let table = self.table.load();

        let Some(first) = args.first() else {
            let fallback = table.null.as_ref().or(table.default.as_ref());
            return match fallback {
                Some(executor) => self.invoke(executor, sender, label, args),
                None => Err(CommandError::not_found(if label.is_empty() {
                    "No command given.".to_string()
                } else {
                    format!("`{label}` needs a subcommand.")
                })),
            };
        };

        // A quoted first token is data for the default route, never a label.
        let typed = first.text();
        let route = if first.is_word() { table.routes.get(&typed.to_lowercase()) } else { None };
        match route {
            Some(route) => {
                let sub_label = join_label(label, &route.canonical);
                tracing::trace!(label = %sub_label, "routing");
                self.invoke(&route.executor, sender, &sub_label, &args[1..])
            }
            None => match &table.default {
                Some(executor) => {
                    tracing::trace!(label, typed = %typed, "falling back to default route");
                    self.invoke(executor, sender, label, args)
                }
                None => Err(self.not_found(&table, label, &typed)),
            },
        }
    }

    /// Aggregate help from every route, once per executor, under canonical
    /// labels. Executors whose help fails are skipped.
    fn help(&self, sender: &dyn CommandSender, label: &str) -> Result<Vec<HelpEntry>, CommandError> {
        let table = self.table.load();
        let mut seen: Vec<&SharedExecutor> = Vec::new();
        let mut entries = Vec::new();

        let routed = table
            .routes
            .iter()
            .filter(|(key, route)| **key == route.canonical)
            .map(|(_, route)| (join_label(label, &route.canonical), &route.executor));
        let fallbacks = table
            .null
            .iter()
            .chain(table.default.iter())
            .map(|executor| (label.to_string(), executor));

        for (sub_label, executor) in routed.chain(fallbacks) {
            if seen.iter().any(|s| same_executor(s, executor)) || !self.visible(sender, executor) {
                continue;
            }
            seen.push(executor);
            match executor.help(sender, &sub_label) {
                Ok(mut more) => entries.append(&mut more),
                Err(err) => {
                    tracing::warn!(label = %sub_label, error = %err, "skipping help for failing executor");
                }
            }
        }
        Ok(entries)
    }

    fn permission(&self) -> Option<&PermissionNode> {
        self.permission.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::RecordingSender;
    use crate::error::ErrorKind;
    use crate::lexer::tokenize;
    use parking_lot::Mutex;

    /// Records the label and arguments it was called with.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().clone()
        }
    }

    impl CommandExecutor for Arc<Recorder> {
        fn execute(&self, _sender: &dyn CommandSender, label: &str, args: &[Token]) -> Result<(), CommandError> {
            let args = args.iter().map(|t| t.text().into_owned()).collect();
            self.calls.lock().push((label.to_string(), args));
            Ok(())
        }

        fn help(&self, _sender: &dyn CommandSender, label: &str) -> Result<Vec<HelpEntry>, CommandError> {
            Ok(vec![HelpEntry {
                usage: label.to_string(),
                description: None,
            }])
        }
    }

    #[test]
    fn sub_dispatch_shifts_arguments() {
        let router = Router::new();
        let add = Arc::new(Recorder::default());
        router.register_route("add", Arc::clone(&add)).unwrap();
        let sender = RecordingSender::new("alice");
        router.execute(&sender, "list", &tokenize("ADD x y")).unwrap();
        assert_eq!(add.calls(), vec![("list add".to_string(), vec!["x".to_string(), "y".to_string()])]);
    }

    #[test]
    fn unknown_labels_suggest_close_matches() {
        let router = Router::new();
        router.register_route("grant", Arc::new(Recorder::default())).unwrap();
        let sender = RecordingSender::new("alice");
        let err = router.execute(&sender, "perm", &tokenize("grnat bob")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "Unknown subcommand `grnat` for `perm`. Did you mean `grant`?");

        let err = router.execute(&sender, "", &tokenize("zzz")).unwrap_err();
        assert_eq!(err.message(), "Unknown command `zzz`.");
    }

    #[test]
    fn quoted_first_tokens_never_select_a_route() {
        let router = Router::new();
        let grant = Arc::new(Recorder::default());
        let fallback = Arc::new(Recorder::default());
        router.register_route("grant", Arc::clone(&grant)).unwrap();
        let sender = RecordingSender::new("alice");

        let err = router.execute(&sender, "perm", &tokenize(r#""grant" bob"#)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        router.set_default_route(Arc::clone(&fallback));
        router.execute(&sender, "perm", &tokenize(r#""grant" bob"#)).unwrap();
        assert!(grant.calls().is_empty());
        assert_eq!(fallback.calls(), vec![("perm".to_string(), vec!["grant".to_string(), "bob".to_string()])]);
    }

    #[test]
    fn empty_arguments_without_fallbacks_are_not_found() {
        let router = Router::new();
        let sender = RecordingSender::new("alice");
        let err = router.execute(&sender, "perm", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn registration_errors() {
        let router = Router::new();
        router.register_route("a", Arc::new(Recorder::default())).unwrap();
        assert_eq!(
            router.register_route("A", Arc::new(Recorder::default())),
            Err(RegistrationError::DuplicateRoute("A".into()))
        );
        assert_eq!(router.alias("b", "zzz"), Err(RegistrationError::UnknownRoute("zzz".into())));
        assert_eq!(router.alias("a", "a"), Err(RegistrationError::DuplicateRoute("a".into())));
        assert!(matches!(
            router.register_route("two words", Arc::new(Recorder::default())),
            Err(RegistrationError::InvalidLabel(_))
        ));
    }

    #[test]
    fn unregistering_a_canonical_label_drops_its_aliases() {
        let router = Router::new();
        router.register_route("remove", Arc::new(Recorder::default())).unwrap();
        router.alias("rm", "remove").unwrap();
        router.alias("del", "rm").unwrap();
        assert_eq!(router.canonical("DEL").as_deref(), Some("remove"));

        router.unregister_route("rm").unwrap();
        assert_eq!(router.labels(), vec!["del", "remove"]);
        router.unregister_route("remove").unwrap();
        assert!(router.labels().is_empty());
        assert!(router.unregister_route("remove").is_err());
    }
}
