// src/metadata/egg.rs

//! Egg-info naming

use regex::Regex;
use std::sync::LazyLock;

static EGG_DECORATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<stem>.*?)(?P<deco>-py\d\.\d+(?:-[^.]*)?)?(?P<ext>\.egg-info|\.pth)$")
        .expect("valid regex")
});

/// Strip the `-pyX.Y[-platform]` decoration build tools add to egg names
///
/// `Foo-1.2-py3.11-linux-x86_64.egg-info` becomes `Foo-1.2.egg-info`. Names
/// without decoration, or that are not egg-info/pth names, come back as is.
pub fn clean_egg_name(name: &str) -> String {
    match EGG_DECORATION.captures(name) {
        Some(caps) if caps.name("deco").is_some() => {
            format!("{}{}", &caps["stem"], &caps["ext"])
        }
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_egg_name() {
        assert_eq!(
            clean_egg_name("Foo-1.2-py3.11-linux-x86_64.egg-info"),
            "Foo-1.2.egg-info"
        );
        assert_eq!(clean_egg_name("Foo-1.2-py3.11.egg-info"), "Foo-1.2.egg-info");
        assert_eq!(clean_egg_name("foo-nspkg-py3.12.pth"), "foo-nspkg.pth");
    }

    #[test]
    fn test_clean_egg_name_untouched() {
        assert_eq!(clean_egg_name("Foo-1.2.egg-info"), "Foo-1.2.egg-info");
        assert_eq!(clean_egg_name("foo.dist-info"), "foo.dist-info");
        assert_eq!(clean_egg_name("python3.11"), "python3.11");
    }
}
