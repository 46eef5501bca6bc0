//! Owned and borrowed handle lifecycle through the Lua surface.

use cons_lua::testing::ConsoleHarness;

const NEW_BUFFER: &str = r#"cons.CreateConsoleScreenBuffer(
    { "GENERIC_READ", "GENERIC_WRITE" },
    { "FILE_SHARE_READ", "FILE_SHARE_WRITE" },
    "CONSOLE_TEXTMODE_BUFFER")"#;

fn harness() -> ConsoleHarness {
    ConsoleHarness::new().expect("harness init")
}

#[test]
fn close_is_idempotent() {
    let h = harness();
    h.exec(&format!(
        r#"
        local buf = assert({NEW_BUFFER})
        buf:close()
        buf:close()
        "#
    ))
    .expect("double close");
    assert_eq!(h.console().stats().handles_closed, 1);
    assert_eq!(h.console().stats().live_handles, 3);
}

#[test]
fn closed_handle_describes_sentinel_and_rejects_use() {
    let h = harness();
    h.exec(&format!("closed = {NEW_BUFFER}; closed:close()"))
        .expect("setup");

    let text: String = h.eval("return tostring(closed)").expect("tostring");
    assert_eq!(text, "StandardConsoleHandle (0xffffffffffffffff)");

    let err = h.error_of("closed:GetConsoleMode()").expect("raises");
    assert!(
        err.contains("bad argument #1 to 'GetConsoleMode' (access to closed handle)"),
        "{err}"
    );

    // Argument checks never run for a closed handle.
    let err = h.error_of("closed:ReadConsoleInput(0)").expect("raises");
    assert!(err.contains("access to closed handle"), "{err}");
}

#[test]
fn close_on_borrowed_handle_keeps_it_usable() {
    let h = harness();
    let (before, after, mode): (String, String, i64) = h
        .eval(
            r#"
            local out = cons.GetStdHandle("STD_OUTPUT_HANDLE")
            local before = tostring(out)
            out:close()
            out:close()
            return before, tostring(out), out:GetConsoleMode()
            "#,
        )
        .expect("eval");
    assert_eq!(before, after);
    assert_eq!(before, "StandardConsoleHandle (0x0000000000000014)");
    assert_eq!(mode, 0x3);
    assert_eq!(h.console().stats().handles_closed, 0);
}

#[test]
fn unreferenced_owned_handle_is_released_on_collect() {
    let h = harness();
    h.exec(&format!("do local buf = {NEW_BUFFER} end")).expect("create");
    assert_eq!(h.console().stats().live_handles, 4);

    h.collect_garbage().expect("gc");
    assert_eq!(h.console().stats().handles_closed, 1);
    assert_eq!(h.console().stats().live_handles, 3);
}

#[test]
fn collect_after_close_releases_nothing_more() {
    let h = harness();
    h.exec(&format!("do local buf = {NEW_BUFFER}; buf:close() end"))
        .expect("create");
    h.collect_garbage().expect("gc");
    assert_eq!(h.console().stats().handles_closed, 1);
}

#[test]
fn borrowed_handles_survive_collect() {
    let h = harness();
    h.exec("do local a, b = cons.GetStdHandle('STD_INPUT_HANDLE'), cons.GetStdHandle(-11) end")
        .expect("get");
    h.collect_garbage().expect("gc");
    assert_eq!(h.console().stats().handles_closed, 0);
    assert_eq!(h.console().stats().live_handles, 3);
}

#[test]
fn unsupported_buffer_type_is_soft_failure() {
    let h = harness();
    let is_nil: bool = h
        .eval("return cons.CreateConsoleScreenBuffer('GENERIC_READ', 0, 0) == nil")
        .expect("eval");
    assert!(is_nil);
}

#[test]
fn bad_create_flags_are_fatal() {
    let h = harness();
    let err = h
        .error_of("cons.CreateConsoleScreenBuffer('GENERIC_READ', 0, { 'NOPE' })")
        .expect("raises");
    assert!(
        err.contains("bad argument #3 to 'CreateConsoleScreenBuffer' (invalid flag combination)"),
        "{err}"
    );
}

#[test]
fn set_std_handle_redirects_output() {
    let h = harness();
    let same: bool = h
        .eval(&format!(
            r#"
            local buf = {NEW_BUFFER}
            assert(cons.SetStdHandle("STD_OUTPUT_HANDLE", buf))
            return tostring(cons.GetStdHandle("STD_OUTPUT_HANDLE")) == tostring(buf)
            "#
        ))
        .expect("eval");
    assert!(same);
}

#[test]
fn set_std_handle_checks_second_argument() {
    let h = harness();
    let err = h.error_of("cons.SetStdHandle('STD_OUTPUT_HANDLE', 5)").expect("raises");
    assert!(
        err.contains("bad argument #2 to 'SetStdHandle' (StandardConsoleHandle expected, got number)"),
        "{err}"
    );

    let err = h
        .error_of(&format!(
            "local buf = {NEW_BUFFER}; buf:close(); cons.SetStdHandle('STD_OUTPUT_HANDLE', buf)"
        ))
        .expect("raises");
    assert!(
        err.contains("bad argument #2 to 'SetStdHandle' (access to closed handle)"),
        "{err}"
    );
}

#[test]
fn closing_active_buffer_falls_back_to_primary() {
    let h = harness();
    h.exec(&format!(
        r#"
        active = {NEW_BUFFER}
        assert(active:SetConsoleActiveScreenBuffer())
        active:WriteConsole("second")
        "#
    ))
    .expect("switch");
    assert!(h.console().snapshot().lines[0].starts_with("second"));

    h.exec("active:close()").expect("close");
    assert!(h.console().snapshot().lines[0].trim().is_empty());
}
