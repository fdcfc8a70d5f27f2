use anyhow::Result;
use cmdchain_core::arguments::{choice, integer, integer_in, label, optional, remainder, text};
use cmdchain_core::{
    resolve, tokenize, ArgValue, CastLevel, Command, CommandExecutor, ErrorKind, Priority, RecordingSender,
    Signature,
};

fn grant_signatures() -> Result<(Signature, Signature)> {
    let user = Signature::new(vec![label("grant"), label("user"), text("name"), text("permission")])?;
    let role = Signature::new(vec![label("grant"), label("role"), text("role"), text("permission")])?;
    Ok((user, role))
}

#[test]
fn grant_user_selects_the_user_overload() -> Result<()> {
    let (user, role) = grant_signatures()?;
    let resolution = resolve("perm", &[&user, &role], &tokenize("grant user bob read"))?;
    assert_eq!(resolution.index, 0);
    assert_eq!(resolution.arguments.text(0)?, "bob");
    assert_eq!(resolution.arguments.text(1)?, "read");
    assert_eq!(
        resolution.priorities,
        vec![Priority::High, Priority::High, Priority::Low, Priority::Low]
    );
    Ok(())
}

#[test]
fn resolution_is_deterministic() -> Result<()> {
    let (user, role) = grant_signatures()?;
    let loose = Signature::new(vec![text("a"), text("b"), text("c"), text("d")])?;
    let tokens = tokenize("grant role mods write");
    let first = resolve("perm", &[&loose, &user, &role], &tokens)?;
    for _ in 0..32 {
        assert_eq!(resolve("perm", &[&loose, &user, &role], &tokens)?, first);
    }
    assert_eq!(first.index, 2);
    Ok(())
}

#[test]
fn optional_arguments_fill_with_absent() -> Result<()> {
    let roll = Signature::new(vec![optional(integer_in("sides", 2, 100)), optional(integer("count"))])?;
    let r = resolve("roll", &[&roll], &tokenize("20"))?;
    assert_eq!(r.arguments.all(), &[ArgValue::Integer(20), ArgValue::Absent]);
    assert!(r.arguments.is_present(0));
    assert!(!r.arguments.is_present(1));

    let r = resolve("roll", &[&roll], &[])?;
    assert_eq!(r.arguments.all(), &[ArgValue::Absent, ArgValue::Absent]);
    Ok(())
}

#[test]
fn choice_beats_free_text_and_remainder_takes_the_tail() -> Result<()> {
    let mode = Signature::new(vec![label("set"), choice("mode", &["on", "off"])])?;
    let topic = Signature::new(vec![label("set"), remainder("topic")])?;

    let r = resolve("channel", &[&topic, &mode], &tokenize("set OFF"))?;
    assert_eq!(r.index, 1);
    assert_eq!(r.arguments.text(0)?, "off");

    let r = resolve("channel", &[&topic, &mode], &tokenize(r#"set welcome to "the jungle""#))?;
    assert_eq!(r.index, 0);
    assert_eq!(r.arguments.text(0)?, "welcome to the jungle");
    Ok(())
}

#[test]
fn cast_failures_beat_generic_usage_errors() -> Result<()> {
    let roll = Signature::new(vec![label("roll"), integer_in("sides", 2, 100)])?;
    let err = resolve("dice", &[&roll], &tokenize("roll 1"))
        .expect_err("one-sided dice are out of range");
    assert_eq!(err.kind(), ErrorKind::ArgumentCast(CastLevel::Cast));

    let err = resolve("dice", &[&roll], &tokenize("flip")).expect_err("no overload matches");
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert!(err.message().starts_with("No matching arguments."));
    Ok(())
}

#[test]
fn wrong_accessor_is_a_router_cast_error_from_the_body() -> Result<()> {
    let cmd = Command::builder("age")
        .overload(vec![text("who")], |inv| {
            let _years = inv.arguments.integer(0)?;
            Ok(())
        })
        .build()?;
    let sender = RecordingSender::new("alice");
    let err = cmd
        .execute(&sender, "age", &tokenize("bob"))
        .expect_err("text is not an integer");
    assert_eq!(err.kind(), ErrorKind::ArgumentCast(CastLevel::Router));
    Ok(())
}
