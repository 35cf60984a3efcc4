#[cfg(not(windows))]
mod fuzz {
    use honggfuzz::fuzz;
    use mbpatcher::loader;

    pub fn main() {
        loop {
            fuzz!(|data: &[u8]| {
                if let Ok(text) = std::str::from_utf8(data) {
                    let _ = loader::parse_patchinfo(text);
                }
            });
        }
    }
}

fn main() {
    #[cfg(not(windows))]
    fuzz::main();
}
