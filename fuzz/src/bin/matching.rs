#[cfg(not(windows))]
mod fuzz {
    use honggfuzz::fuzz;
    use mbpatcher::loader;

    pub fn main() {
        loop {
            fuzz!(|data: &[u8]| {
                // First line is the file name, the rest is the description file.
                let Ok(text) = std::str::from_utf8(data) else {
                    return;
                };
                let Some((file_name, xml)) = text.split_once('\n') else {
                    return;
                };

                if let Ok(parsed) = loader::parse_patchinfo(xml)
                    && let Some(info) = parsed.value
                    && info.matches(file_name)
                {
                    let rule_type = info.rule_type_for(file_name);
                    let _ = info.resolve_partconfigs(&rule_type);
                    let _ = info.resolve_autopatchers(&rule_type);
                }
            });
        }
    }
}

fn main() {
    #[cfg(not(windows))]
    fuzz::main();
}
