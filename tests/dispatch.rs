// tests/dispatch.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use comando::core::source::named_source_permissions;
use comando::system::executor::ExecutionOutcome;
use comando::{
    Command, CommandDispatch, CoordinatorMode, DispatchError, Dispatcher, EngineConfig, ErrorKind,
    NamedSource, Parameter, RegistrationError, Usage, VerifierMode,
};

type P = Parameter<NamedSource>;

fn tokens(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|t| t.to_string()).collect()
}

fn ban_dispatcher() -> Dispatcher<NamedSource> {
    let ban = Command::new("ban")
        .with_usage(
            Usage::builder()
                .param(P::string("target"))
                .param(P::switch("silent", ["s", "silent"]))
                .param(P::string("duration").optional().default_value("perm"))
                .param(P::string("reason").optional().greedy())
                .build(),
        )
        .unwrap();
    let mut dispatcher = Dispatcher::default();
    dispatcher.register(ban).unwrap();
    dispatcher
}

#[test]
fn ban_with_only_a_target_uses_defaults() {
    let dispatcher = ban_dispatcher();
    let console = NamedSource::new("console");
    let CommandDispatch::Complete { context, .. } = dispatcher.dispatch(&console, "ban", &tokens(&["Steve"])).unwrap()
    else {
        panic!("se esperaba un despacho completo");
    };
    assert_eq!(context.get_str("target"), Some("Steve"));
    assert!(!context.switch("silent"));
    assert_eq!(context.get_str("duration"), Some("perm"));
    assert!(context.get("reason").is_none());
}

#[test]
fn ban_with_flags_and_a_greedy_reason() {
    let dispatcher = ban_dispatcher();
    let console = NamedSource::new("console");
    let line = tokens(&["Steve", "-s", "1d", "greedy", "reason", "here"]);
    let CommandDispatch::Complete { context, .. } = dispatcher.dispatch(&console, "BAN", &line).unwrap() else {
        panic!("se esperaba un despacho completo");
    };
    assert!(context.switch("silent"));
    assert_eq!(context.get_str("duration"), Some("1d"));
    assert_eq!(context.get_str("reason"), Some("greedy reason here"));
}

#[test]
fn dispatching_is_idempotent() {
    let dispatcher = ban_dispatcher();
    let console = NamedSource::new("console");
    let line = tokens(&["Alex", "--silent", "7d"]);
    let first = dispatcher.dispatch(&console, "ban", &line);
    let second = dispatcher.dispatch(&console, "ban", &line);
    assert!(first.as_ref().is_ok_and(CommandDispatch::is_complete));
    assert_eq!(first, second);
}

#[test]
fn max_length_binds_and_one_more_token_is_unknown() {
    let usage = Usage::builder()
        .param(P::string("name"))
        .param(P::integer("count"))
        .param(P::string("note").optional())
        .build();
    assert_eq!(usage.max_length(), 3);
    let mut dispatcher = Dispatcher::default();
    dispatcher
        .register(Command::new("tag").with_usage(usage).unwrap())
        .unwrap();
    let console = NamedSource::new("console");

    let full = dispatcher.dispatch(&console, "tag", &tokens(&["x", "2", "y"])).unwrap();
    assert!(full.is_complete());
    assert_eq!(
        dispatcher.dispatch(&console, "tag", &tokens(&["x", "2", "y", "z"])),
        Ok(CommandDispatch::Unknown)
    );
    assert!(matches!(
        dispatcher.dispatch(&console, "tag", &tokens(&["x"])),
        Ok(CommandDispatch::Incomplete { ref missing, .. }) if missing == &["count"]
    ));
    assert!(matches!(
        dispatcher.dispatch(&console, "tag", &tokens(&["x", "dos"])),
        Ok(CommandDispatch::Unknown) | Err(DispatchError::ValueParseFailure { .. })
    ));
}

#[test]
fn strict_mode_rejects_same_length_usages() {
    let mut give = Command::<NamedSource>::new("give").verifier_mode(VerifierMode::Strict);
    give.add_usage(Usage::builder().param(P::string("target")).build())
        .unwrap();
    let clash = give.add_usage(Usage::builder().param(P::integer("amount")).build());
    assert!(matches!(clash, Err(RegistrationError::AmbiguousUsage { .. })));
    assert_eq!(give.usages().len(), 1);
}

#[test]
fn type_tolerant_mode_routes_by_value_kind() {
    let give = Command::new("give")
        .verifier_mode(VerifierMode::TypeTolerant)
        .with_usage(Usage::builder().param(P::integer("amount")).build())
        .unwrap()
        .with_usage(Usage::builder().param(P::string("target")).build())
        .unwrap();
    let mut dispatcher = Dispatcher::default();
    dispatcher.register(give).unwrap();
    let console = NamedSource::new("console");

    let CommandDispatch::Complete { usage, context } = dispatcher.dispatch(&console, "give", &tokens(&["5"])).unwrap()
    else {
        panic!("se esperaba un despacho completo");
    };
    assert_eq!(usage.signature(), "give <amount>");
    assert_eq!(context.get_i64("amount"), Some(5));

    let CommandDispatch::Complete { usage, .. } = dispatcher.dispatch(&console, "give", &tokens(&["Steve"])).unwrap()
    else {
        panic!("se esperaba un despacho completo");
    };
    assert_eq!(usage.signature(), "give <target>");
}

#[test]
fn subcommands_inherit_and_extend_permissions() {
    let group = Command::new("group")
        .alias("g")
        .permission("perm.group")
        .with_usage(
            Usage::builder()
                .param(P::string("name"))
                .param(P::string("node"))
                .build(),
        )
        .unwrap();
    let perm = Command::new("perm")
        .permission("perm")
        .with_subcommand(group)
        .unwrap();
    let mut dispatcher =
        Dispatcher::new(EngineConfig::<NamedSource>::new().with_permission_checker(named_source_permissions));
    dispatcher.register(perm).unwrap();

    let line = tokens(&["g", "admins", "fly"]);
    let helper = NamedSource::new("helper").with_permission("perm");
    assert!(matches!(
        dispatcher.dispatch(&helper, "perm", &line),
        Err(DispatchError::PermissionDenied { .. })
    ));

    let admin = helper.clone().with_permission("perm.group");
    let CommandDispatch::Complete { context, .. } = dispatcher.dispatch(&admin, "perm", &line).unwrap() else {
        panic!("se esperaba un despacho completo");
    };
    assert_eq!(context.command_path(), ["perm", "group"]);
    assert_eq!(context.get_str("node"), Some("fly"));
}

#[test]
fn default_usage_runs_without_arguments() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let help = Command::new("help")
        .default_usage(
            Usage::builder()
                .executes(move |_: &NamedSource, _: &comando::ResolvedContext<NamedSource>| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build(),
        )
        .with_usage(Usage::builder().param(P::string("topic")).build())
        .unwrap();
    let mut dispatcher = Dispatcher::default();
    dispatcher.register(help).unwrap();

    let console = NamedSource::new("console");
    assert!(matches!(dispatcher.execute(&console, "help"), Ok(ExecutionOutcome::Completed)));
    assert!(dispatcher.execute(&console, "help flags").is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failures_reach_the_registered_handlers() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let config = EngineConfig::<NamedSource>::new().on_error(ErrorKind::NumberOutOfRange, move |source: &NamedSource, error| {
        sink.lock().unwrap().push(format!("{}: {}", source.name, error));
    });
    let mut dispatcher = Dispatcher::new(config);
    dispatcher
        .register(
            Command::new("speed")
                .with_usage(Usage::builder().param(P::float("value").range(Some(0.0), Some(10.0))).build())
                .unwrap(),
        )
        .unwrap();

    let console = NamedSource::new("console");
    assert!(matches!(
        dispatcher.execute(&console, "speed 11"),
        Err(DispatchError::NumberOutOfRange { .. })
    ));
    // Sin manejador para este tipo: solo se devuelve.
    assert!(dispatcher.execute(&console, "speed rápido").is_err());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn asynchronous_usages_do_not_block_the_caller() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);

    let config = EngineConfig::<NamedSource>::new().on_error(ErrorKind::Execution, move |_: &NamedSource, error| {
        sink.lock().unwrap().push(error.to_string());
    });
    let mut dispatcher = Dispatcher::new(config);
    dispatcher
        .register(
            Command::new("save")
                .with_usage(
                    Usage::builder()
                        .param(P::string("world"))
                        .coordinator(CoordinatorMode::Asynchronous)
                        .executes(move |_: &NamedSource, ctx: &comando::ResolvedContext<NamedSource>| {
                            counter.fetch_add(1, Ordering::SeqCst);
                            match ctx.get_str("world") {
                                Some("nether") => Err("disco lleno".into()),
                                _ => Ok(()),
                            }
                        })
                        .build(),
                )
                .unwrap(),
        )
        .unwrap();

    let console = NamedSource::new("console");
    for line in ["save overworld", "save nether"] {
        match dispatcher.execute(&console, line) {
            Ok(ExecutionOutcome::Scheduled(task)) => task.await.unwrap(),
            other => panic!("se esperaba una tarea programada: {:?}", other),
        }
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("disco lleno"));
}

fn ban_usage() -> Usage<NamedSource> {
    Usage::builder()
        .param(P::string("target"))
        .param(P::switch("silent", ["s", "silent"]))
        .param(P::string("duration").optional().default_value("perm"))
        .param(P::string("reason").optional().greedy())
        .build()
}

#[test]
fn a_bare_target_usage_clashes_with_the_full_ban_usage() {
    let bare = || Usage::builder().param(P::string("target")).build();
    for mode in [VerifierMode::Strict, VerifierMode::TypeTolerant] {
        let mut ban = Command::<NamedSource>::new("ban").verifier_mode(mode);
        ban.add_usage(bare()).unwrap();
        let clash = ban.add_usage(ban_usage());
        assert!(matches!(clash, Err(RegistrationError::AmbiguousUsage { .. })), "{:?}", mode);

        let mut ban = Command::<NamedSource>::new("ban").verifier_mode(mode);
        ban.add_usage(ban_usage()).unwrap();
        let clash = ban.add_usage(bare());
        assert!(matches!(clash, Err(RegistrationError::AmbiguousUsage { .. })), "{:?}", mode);
    }
}

#[test]
fn a_default_usage_covers_the_bare_ban() {
    let ban = Command::new("ban")
        .default_usage(Usage::builder().build())
        .with_usage(ban_usage())
        .unwrap();
    let mut dispatcher = Dispatcher::default();
    dispatcher.register(ban).unwrap();
    let console = NamedSource::new("console");

    let CommandDispatch::Complete { usage, .. } = dispatcher.dispatch(&console, "ban", &[]).unwrap() else {
        panic!("se esperaba un despacho completo");
    };
    assert_eq!(usage.signature(), "ban");

    let CommandDispatch::Complete { context, .. } = dispatcher.dispatch(&console, "ban", &tokens(&["Steve"])).unwrap()
    else {
        panic!("se esperaba un despacho completo");
    };
    assert_eq!(context.get_str("target"), Some("Steve"));
    assert_eq!(context.get_str("duration"), Some("perm"));
}

#[test]
fn greedy_and_plain_parameters_route_to_their_own_usage() {
    let msg = Command::new("msg")
        .with_usage(
            Usage::builder()
                .param(P::literal("a"))
                .param(P::string("x"))
                .param(P::string("y"))
                .build(),
        )
        .unwrap()
        .with_usage(
            Usage::builder()
                .param(P::literal("a"))
                .param(P::string("x").greedy())
                .build(),
        )
        .unwrap();
    let mut dispatcher = Dispatcher::default();
    dispatcher.register(msg).unwrap();
    let console = NamedSource::new("console");

    let CommandDispatch::Complete { usage, context } =
        dispatcher.dispatch(&console, "msg", &tokens(&["a", "foo", "bar", "baz"])).unwrap()
    else {
        panic!("se esperaba un despacho completo");
    };
    assert_eq!(usage.signature(), "msg a <x...>");
    assert_eq!(context.get_str("x"), Some("foo bar baz"));

    let CommandDispatch::Complete { usage, .. } =
        dispatcher.dispatch(&console, "msg", &tokens(&["a", "foo", "bar"])).unwrap()
    else {
        panic!("se esperaba un despacho completo");
    };
    assert_eq!(usage.signature(), "msg a <x> <y>");
}

#[test]
fn optional_and_required_parameters_route_to_their_own_usage() {
    let warp = Command::new("warp")
        .with_usage(
            Usage::builder()
                .param(P::literal("to"))
                .param(P::string("place"))
                .param(P::string("player"))
                .build(),
        )
        .unwrap()
        .with_usage(
            Usage::builder()
                .param(P::literal("to"))
                .param(P::string("place").optional().default_value("spawn"))
                .build(),
        )
        .unwrap();
    let mut dispatcher = Dispatcher::default();
    dispatcher.register(warp).unwrap();
    let console = NamedSource::new("console");

    let CommandDispatch::Complete { usage, context } = dispatcher.dispatch(&console, "warp", &tokens(&["to"])).unwrap()
    else {
        panic!("se esperaba un despacho completo");
    };
    assert_eq!(usage.signature(), "warp to [place]");
    assert_eq!(context.get_str("place"), Some("spawn"));

    let CommandDispatch::Complete { usage, .. } =
        dispatcher.dispatch(&console, "warp", &tokens(&["to", "nether", "Alex"])).unwrap()
    else {
        panic!("se esperaba un despacho completo");
    };
    assert_eq!(usage.signature(), "warp to <place> <player>");
}

#[test]
fn a_guarded_parameter_in_the_middle_denies_the_whole_path() {
    let item = Command::new("item")
        .with_usage(
            Usage::builder()
                .param(P::string("what").permission("give.what"))
                .param(P::string("to"))
                .build(),
        )
        .unwrap();
    let mut dispatcher =
        Dispatcher::new(EngineConfig::<NamedSource>::new().with_permission_checker(named_source_permissions));
    dispatcher.register(item).unwrap();
    let line = tokens(&["apple", "Steve"]);

    let guest = NamedSource::new("guest");
    assert_eq!(
        dispatcher.dispatch(&guest, "item", &line),
        Err(DispatchError::PermissionDenied {
            command: "item".into(),
            permission: Some("give.what".into()),
        })
    );

    let giver = NamedSource::new("giver").with_permission("give.what");
    assert!(dispatcher.dispatch(&giver, "item", &line).is_ok_and(|d| d.is_complete()));
}
