//! Built-in exclusion list.
//!
//! Names here never make sense inside a remote sandbox checkout: they are
//! either regenerated there, machine-specific, or secrets.

pub const DEFAULT_EXCLUDES: &[&str] = &[
    // Version control
    ".git",
    ".svn",
    ".hg",
    ".bzr",
    // Package manager dependencies
    "node_modules",
    "bower_components",
    "jspm_packages",
    ".pnpm-store",
    ".yarn",
    ".bundle",
    // Virtual environments
    ".venv",
    "venv",
    "virtualenv",
    "__pypackages__",
    ".tox",
    ".nox",
    // Build output
    "dist",
    "build",
    "out",
    "target",
    ".next",
    ".nuxt",
    ".output",
    ".svelte-kit",
    ".turbo",
    ".vercel",
    ".expo",
    "coverage",
    ".nyc_output",
    "*.tsbuildinfo",
    // Caches
    ".cache",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".gradle",
    ".parcel-cache",
    ".eslintcache",
    ".sass-cache",
    ".terraform",
    // Secrets and credentials
    ".env",
    ".env.*",
    "*.pem",
    "*.key",
    "*.p12",
    "*.pfx",
    "*.keystore",
    "id_rsa",
    "id_ed25519",
    ".netrc",
    ".npmrc",
    "credentials.json",
    // OS and editor artifacts
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    ".Spotlight-V100",
    ".Trashes",
    ".idea",
    ".vscode",
    "*.swp",
    "*.swo",
    "*~",
    // Logs
    "*.log",
    "logs",
    "npm-debug.log*",
    "yarn-debug.log*",
    "yarn-error.log*",
    "pnpm-debug.log*",
    // Compiled objects
    "*.pyc",
    "*.pyo",
    "*.class",
    "*.o",
    "*.obj",
    "*.so",
    "*.dylib",
    "*.dll",
    "*.exe",
    "*.a",
    // Source maps
    "*.map",
];
