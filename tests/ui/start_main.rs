use fibril::{Status, Value};

#[fibril::start]
fn main() {
    let handle = fibril::create("ui", |_| {}).unwrap();
    fibril::resume(handle, Value::NULL).unwrap();

    assert_eq!(fibril::status_of(handle).unwrap(), Status::Dead);
}
