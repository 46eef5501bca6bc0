//! Flag arguments as seen from Lua: names, numbers and arrays.

use cons_lua::testing::ConsoleHarness;

fn harness() -> ConsoleHarness {
    ConsoleHarness::new().expect("harness init")
}

#[test]
fn combination_equals_or_of_members() {
    let h = harness();
    let (applied, expected): (i64, i64) = h
        .eval(
            r#"
            local out = cons.GetStdHandle("STD_OUTPUT_HANDLE")
            assert(out:SetConsoleTextAttribute({ "FOREGROUND_RED", "FOREGROUND_GREEN", 0x80 }))
            local f = cons.GetFlags()
            return out:GetConsoleScreenBufferInfo().wAttributes,
                   f.FOREGROUND_RED | f.FOREGROUND_GREEN | 0x80
            "#,
        )
        .expect("eval");
    assert_eq!(applied, expected);
}

#[test]
fn unknown_name_fails_whole_combination() {
    let h = harness();
    let err = h
        .error_of(
            r#"
            local out = cons.GetStdHandle("STD_OUTPUT_HANDLE")
            out:SetConsoleMode({ "ENABLE_PROCESSED_OUTPUT", "BOGUS" })
            "#,
        )
        .expect("raises");
    assert!(
        err.contains("bad argument #2 to 'SetConsoleMode' (invalid flag combination)"),
        "{err}"
    );

    // The mode is untouched: the console was never called.
    let mode: i64 = h
        .eval("return cons.GetStdHandle('STD_OUTPUT_HANDLE'):GetConsoleMode()")
        .expect("eval");
    assert_eq!(mode, 0x3);
}

#[test]
fn gap_ends_combination() {
    let h = harness();
    let (ok, mode): (bool, i64) = h
        .eval(
            r#"
            local out = cons.GetStdHandle("STD_OUTPUT_HANDLE")
            local ok = out:SetConsoleMode({ "ENABLE_PROCESSED_OUTPUT", nil, "BOGUS" })
            return ok, out:GetConsoleMode()
            "#,
        )
        .expect("eval");
    assert!(ok);
    assert_eq!(mode, 0x1);
}

#[test]
fn nil_combination_is_zero() {
    let h = harness();
    let mode: i64 = h
        .eval(
            r#"
            local out = cons.GetStdHandle("STD_OUTPUT_HANDLE")
            out:SetConsoleMode(nil)
            return out:GetConsoleMode()
            "#,
        )
        .expect("eval");
    assert_eq!(mode, 0);
}

#[test]
fn strict_single_flag_rejects_arrays_and_unknown_names() {
    let h = harness();
    let err = h.error_of("cons.GetStdHandle({ 'STD_OUTPUT_HANDLE' })").expect("raises");
    assert!(err.contains("bad argument #1 to 'GetStdHandle' (invalid flag)"), "{err}");

    let err = h.error_of("cons.GetStdHandle('STD_NOWHERE')").expect("raises");
    assert!(err.contains("invalid flag"), "{err}");

    let err = h.error_of("cons.GenerateConsoleCtrlEvent(true, 0)").expect("raises");
    assert!(err.contains("bad argument #1 to 'GenerateConsoleCtrlEvent'"), "{err}");
}

#[test]
fn numeric_flags_pass_through() {
    let h = harness();
    let same: bool = h
        .eval("return tostring(cons.GetStdHandle(-11)) == tostring(cons.GetStdHandle('STD_OUTPUT_HANDLE'))")
        .expect("eval");
    assert!(same);

    // Floats truncate toward zero.
    let same: bool = h
        .eval("return tostring(cons.GetStdHandle(-11.7)) == tostring(cons.GetStdHandle(-11))")
        .expect("eval");
    assert!(same);
}

#[test]
fn well_formed_unknown_device_is_soft_failure() {
    let h = harness();
    let is_nil: bool = h.eval("return cons.GetStdHandle(5) == nil").expect("eval");
    assert!(is_nil);
}

#[test]
fn ctrl_event_by_name() {
    let h = harness();
    let ok: bool = h
        .eval("return cons.GenerateConsoleCtrlEvent('CTRL_BREAK_EVENT', 0)")
        .expect("eval");
    assert!(ok);
    assert_eq!(h.console().ctrl_events(), vec![(1, 0)]);
}

#[test]
fn custom_flags_resolve() {
    let h = ConsoleHarness::with_flags(&[("HIGHLIGHT", 0x1E)]).expect("harness init");
    let attr: i64 = h
        .eval(
            r#"
            local out = cons.GetStdHandle("STD_OUTPUT_HANDLE")
            out:SetConsoleTextAttribute("HIGHLIGHT")
            return out:GetConsoleScreenBufferInfo().wAttributes
            "#,
        )
        .expect("eval");
    assert_eq!(attr, 0x1E);
}
