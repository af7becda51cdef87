#[test]
fn mkt_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/mkt_error_pass.rs");
}
