use std::path::{Path, PathBuf};

use anyhow::Context as _;
use memorial_store::{
    BirthdayWish, ChangeNotifier, FileStore, NewWish, StoreConfig, StoreMode, Subscription,
    UploadFile, Uploader, WallEntry, WallStore, WishStore,
};

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("memorial")
}

/// `memorial.toml` in the data directory wins over the environment.
pub fn load_config(data_dir: &Path, local: bool) -> anyhow::Result<StoreConfig> {
    let path = data_dir.join(StoreConfig::filename());
    let mut config = if path.exists() {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        StoreConfig::from_toml(&text).with_context(|| format!("parsing {}", path.display()))?
    } else {
        StoreConfig::from_env()
    };
    if local {
        config.api_base_url = None;
    }
    Ok(config)
}

pub struct Context {
    config: StoreConfig,
    wall: WallStore<FileStore>,
    wishes: WishStore<FileStore>,
    _changes: Subscription,
}

impl Context {
    pub fn open(data_dir: PathBuf, local: bool) -> anyhow::Result<Self> {
        let config = load_config(&data_dir, local)?;
        let storage = FileStore::new(data_dir);
        let notifier = ChangeNotifier::new();

        let wall = WallStore::new(&config, storage.clone())?.with_notifier(notifier.clone());
        let wishes = WishStore::new(storage).with_notifier(notifier.clone());
        let changes = notifier.subscribe(|signal| tracing::debug!(key = %signal.key, "Changed"));

        match wall.mode() {
            StoreMode::RemoteFirst => tracing::info!(
                api = config.api_base_url.as_deref().unwrap_or_default(),
                "Using remote wall"
            ),
            StoreMode::LocalOnly => tracing::info!("Using local wall"),
        }

        Ok(Self {
            config,
            wall,
            wishes,
            _changes: changes,
        })
    }

    pub async fn wall_list(&self, limit: usize) -> anyhow::Result<()> {
        let mut entries = self.wall.list(limit).await;
        sort_newest_first(&mut entries);
        if entries.is_empty() {
            println!("The wall is empty.");
        }
        for entry in &entries {
            println!("{}\n", format_entry(entry));
        }
        Ok(())
    }

    pub async fn wall_post(
        &self,
        author: &str,
        message: &str,
        images: &[PathBuf],
    ) -> anyhow::Result<()> {
        let files = images
            .iter()
            .map(|path| {
                UploadFile::from_path(path).with_context(|| format!("reading {}", path.display()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let uploader = Uploader::from_config(&self.config)?;

        let entry = self.wall.post(author, message, &files, &uploader).await?;
        println!("Posted {}", entry.id);
        Ok(())
    }

    pub async fn wall_flower(&self, id: &str) -> anyhow::Result<()> {
        match self.wall.add_flower(id).await? {
            Some(entry) => println!("{} now has {}", entry.id, flowers(entry.flowers)),
            None => anyhow::bail!("could not leave a flower on {id}"),
        }
        Ok(())
    }

    pub async fn wishes_list(&self, member: &str) -> anyhow::Result<()> {
        let wishes = self.wishes.list(member).await;
        if wishes.is_empty() {
            println!("No wishes for {member} yet.");
        }
        for wish in &wishes {
            println!("{}\n", format_wish(wish));
        }
        Ok(())
    }

    pub async fn wishes_add(&self, member: &str, author: &str, text: &str) -> anyhow::Result<()> {
        let wish = self.wishes.create(member, NewWish::new(author, text)?).await?;
        println!("Added wish {} for {member}", wish.id);
        Ok(())
    }
}

fn sort_newest_first(entries: &mut [WallEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn flowers(count: u64) -> String {
    match count {
        1 => "1 flower".to_string(),
        n => format!("{n} flowers"),
    }
}

fn format_entry(entry: &WallEntry) -> String {
    let mut out = format!(
        "{} · {} · {}\n  {}",
        entry.author,
        entry.created_at.format("%Y-%m-%d %H:%M"),
        flowers(entry.flowers),
        entry.message
    );
    for image in &entry.images {
        out.push_str(&format!("\n  [image] {}", image.url));
    }
    out.push_str(&format!("\n  id: {}", entry.id));
    out
}

fn format_wish(wish: &BirthdayWish) -> String {
    format!(
        "{} · {}\n  {}",
        wish.author,
        wish.created_at.format("%Y-%m-%d"),
        wish.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use memorial_store::WallImage;

    fn entry(id: &str, year: i32) -> WallEntry {
        WallEntry {
            id: id.to_string(),
            author: "Jane".to_string(),
            message: "Miss you".to_string(),
            created_at: Utc.with_ymd_and_hms(year, 5, 1, 10, 30, 0).unwrap(),
            flowers: 1,
            images: vec![WallImage::new("https://cdn.example/a.jpg")],
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("memorial_cli_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_sort_newest_first() {
        let mut entries = vec![entry("old", 2020), entry("new", 2024), entry("mid", 2022)];
        sort_newest_first(&mut entries);
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["new", "mid", "old"]);
    }

    #[test]
    fn test_format_entry() {
        let text = format_entry(&entry("abc", 2024));
        assert!(text.starts_with("Jane · 2024-05-01 10:30 · 1 flower\n  Miss you"));
        assert!(text.contains("[image] https://cdn.example/a.jpg"));
        assert!(text.ends_with("id: abc"));
        assert_eq!(flowers(0), "0 flowers");
    }

    #[test]
    fn test_config_file_wins_and_local_flag_clears_api() {
        let dir = temp_dir("config");
        std::fs::write(
            dir.join("memorial.toml"),
            "api_base_url = \"https://memorial.example.org\"\n",
        )
        .unwrap();

        let config = load_config(&dir, false).unwrap();
        assert_eq!(
            config.api_base_url.as_deref(),
            Some("https://memorial.example.org")
        );
        assert_eq!(load_config(&dir, true).unwrap().api_base_url, None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_broken_config_file_is_reported() {
        let dir = temp_dir("broken");
        std::fs::write(dir.join("memorial.toml"), "api_base_url = [").unwrap();

        let err = load_config(&dir, false).unwrap_err();
        assert!(err.to_string().starts_with("parsing "));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_local_session_round_trip() {
        let dir = temp_dir("session");
        let ctx = Context::open(dir.clone(), true).unwrap();

        ctx.wall_post("Jane", "Miss you", &[]).await.unwrap();
        let listed = ctx.wall.list(10).await;
        assert_eq!(listed.len(), 1);
        ctx.wall_flower(&listed[0].id).await.unwrap();
        assert!(ctx.wall_flower("missing").await.is_err());

        ctx.wishes_add("grandma", "", "Happy birthday!").await.unwrap();
        assert_eq!(ctx.wishes.list("grandma").await[0].author, "Anonymous");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
