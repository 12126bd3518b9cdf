#[test]
fn start_attribute() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/*.rs");
}
