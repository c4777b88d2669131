use std::collections::HashMap;

use once_cell::sync::Lazy;

/// A 24x24 vector glyph. `body` is an SVG fragment ready to be dropped
/// inside a scaled `<g>`.
#[derive(Debug)]
pub struct Icon {
    pub name: &'static str,
    pub view_box: f32,
    pub body: &'static str,
}

/// Generic database cylinder, also the fallback for every unknown name.
static FALLBACK: Icon = Icon {
    name: "generic",
    view_box: 24.0,
    body: concat!(
        r##"<ellipse cx="12" cy="6" rx="8" ry="3" fill="#666"/>"##,
        r##"<path d="M4 6v12c0 1.66 3.58 3 8 3s8-1.34 8-3V6" stroke="#666" stroke-width="2" fill="none"/>"##,
        r##"<path d="M4 12c0 1.66 3.58 3 8 3s8-1.34 8-3" stroke="#666" stroke-width="2" fill="none"/>"##,
    ),
};

static CLOUD: Icon = Icon {
    name: "cloud",
    view_box: 24.0,
    body: r##"<path d="M19 18H6a4 4 0 1 1 .5-7.97A5.5 5.5 0 0 1 17 8.5c0 .17 0 .34-.02.5A4 4 0 0 1 19 18z" stroke="#666" stroke-width="2" fill="none"/>"##,
};

static CUBE: Icon = Icon {
    name: "cube",
    view_box: 24.0,
    body: concat!(
        r##"<path d="M12 2l9 5v10l-9 5-9-5V7z" stroke="#666" stroke-width="2" fill="none"/>"##,
        r##"<path d="M12 12l9-5M12 12L3 7M12 12v10" stroke="#666" stroke-width="2" fill="none"/>"##,
    ),
};

static GEAR: Icon = Icon {
    name: "gear",
    view_box: 24.0,
    body: concat!(
        r##"<circle cx="12" cy="12" r="3" stroke="#666" stroke-width="2" fill="none"/>"##,
        r##"<path d="M12 2v3m0 14v3M2 12h3m14 0h3M4.9 4.9l2.1 2.1m10 10l2.1 2.1m0-14.2l-2.1 2.1m-10 10l-2.1 2.1" stroke="#666" stroke-width="2" fill="none"/>"##,
    ),
};

static QUEUE: Icon = Icon {
    name: "queue",
    view_box: 24.0,
    body: r##"<path d="M3 6h18M3 12h18M3 18h12" stroke="#666" stroke-width="2" fill="none"/>"##,
};

static GLOBE: Icon = Icon {
    name: "globe",
    view_box: 24.0,
    body: concat!(
        r##"<circle cx="12" cy="12" r="9" stroke="#666" stroke-width="2" fill="none"/>"##,
        r##"<path d="M3 12h18M12 3a14 14 0 0 1 0 18M12 3a14 14 0 0 0 0 18" stroke="#666" stroke-width="2" fill="none"/>"##,
    ),
};

static BOLT: Icon = Icon {
    name: "bolt",
    view_box: 24.0,
    body: r##"<path d="M13 2L4 14h6l-1 8 9-12h-6z" stroke="#666" stroke-width="2" fill="none"/>"##,
};

static ICONS: Lazy<HashMap<&'static str, &'static Icon>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, &'static Icon> = HashMap::new();
    for name in [
        "postgres",
        "postgresql",
        "mysql",
        "mariadb",
        "sqlite",
        "mongodb",
        "redis",
        "dynamodb",
        "couchdb",
        "oracle",
    ] {
        map.insert(name, &FALLBACK);
    }
    for name in [
        "aws",
        "amazonaws",
        "gcp",
        "googlecloud",
        "azure",
        "digitalocean",
        "heroku",
        "vercel",
        "netlify",
        "cloudflare",
        "firebase",
    ] {
        map.insert(name, &CLOUD);
    }
    for name in ["docker", "kubernetes", "k8s", "podman"] {
        map.insert(name, &CUBE);
    }
    for name in ["kafka", "rabbitmq", "sqs"] {
        map.insert(name, &QUEUE);
    }
    for name in ["nginx", "apache", "terraform", "ansible", "jenkins"] {
        map.insert(name, &GEAR);
    }
    for name in ["react", "vue", "angular", "svelte", "nextjs", "web", "cdn"] {
        map.insert(name, &GLOBE);
    }
    for name in ["lambda", "functions", "node", "nodejs", "bun"] {
        map.insert(name, &BOLT);
    }
    map
});

/// Look up a glyph by name, case-insensitively. Unknown names always get
/// the placeholder; there is no error path.
pub fn resolve(name: &str) -> &'static Icon {
    let key = name.to_ascii_lowercase();
    ICONS.get(key.as_str()).copied().unwrap_or(&FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_resolve() {
        assert_eq!(resolve("docker").name, "cube");
        assert_eq!(resolve("Kafka").name, "queue");
        assert_eq!(resolve("POSTGRES").name, "generic");
    }

    #[test]
    fn unknown_names_fall_back() {
        let icon = resolve("totally-unknown-tool");
        assert_eq!(icon.name, "generic");
        assert!(icon.body.contains("ellipse"));
    }
}
