use fibril::Value;

#[fibril::start]
fn main() -> Result<(), fibril::Error> {
    let echo = fibril::create("echo", |value| {
        fibril::yield_now(value).unwrap();
    })?;

    assert_eq!(fibril::resume(echo, Value::from(5))?, Value::from(5));
    Ok(())
}
