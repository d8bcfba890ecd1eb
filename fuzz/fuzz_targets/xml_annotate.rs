use honggfuzz::fuzz;
use vc5meta::{compute_sizes, read_xml, Config, Validator};

fn main() {
    let config = Config::default();
    let validator = Validator::new(&config.types, &config.schema);
    loop {
        fuzz!(|data: &[u8]| {
            let Ok(text) = std::str::from_utf8(data) else {
                return;
            };
            if let Ok(mut metadata) = read_xml(text) {
                compute_sizes(&mut metadata, &config.types);
                // A freshly annotated tree must never report layout errors.
                let report = validator.validate(&metadata);
                assert!(report
                    .violations
                    .iter()
                    .all(|v| !v.message.starts_with("incorrect padding")));
            }
        });
    }
}
