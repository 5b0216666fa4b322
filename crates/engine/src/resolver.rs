use crate::binding::BindingProfile;
use crate::fallback::{first_success, Strategy};
use layout_indexer::ImageAsset;
use layout_protocol::AssetDb;
use std::sync::Arc;

/// Finds the sprite frame uuid of an imported image.
pub struct SpriteFrameResolver {
    assets: Arc<dyn AssetDb>,
    /// Asset-db path of the folder the images were copied into.
    db_root: String,
    sub_asset: String,
    frame_suffix: String,
}

impl SpriteFrameResolver {
    pub fn new(
        assets: Arc<dyn AssetDb>,
        db_root: impl Into<String>,
        profile: &BindingProfile,
    ) -> Self {
        Self {
            assets,
            db_root: db_root.into().trim_end_matches('/').to_string(),
            sub_asset: profile.sub_asset.clone(),
            frame_suffix: profile.frame_suffix.clone(),
        }
    }

    pub fn image_db_path(&self, image: &ImageAsset) -> String {
        format!("{}/{}", self.db_root, image.relative_path)
    }

    /// `None` once every lookup missed; the caller carries on without a
    /// sprite.
    pub async fn resolve(&self, name: &str, image: &ImageAsset) -> Option<String> {
        let image_path = self.image_db_path(image);
        let frame_path = format!("{image_path}/{}", self.sub_asset);
        let assets = &self.assets;

        let strategies = vec![
            Strategy::new(format!("sub-asset {frame_path}"), async {
                assets
                    .query_asset_info(&frame_path)
                    .await
                    .map(|info| info.and_then(|info| info.uuid))
            }),
            Strategy::new(format!("image {image_path} + {}", self.frame_suffix), async {
                assets.query_asset_info(&image_path).await.map(|info| {
                    info.and_then(|info| info.uuid)
                        .map(|uuid| format!("{uuid}{}", self.frame_suffix))
                })
            }),
            Strategy::new(format!("meta {image_path}"), async {
                assets.query_asset_meta(&image_path).await.map(|meta| {
                    meta.and_then(|meta| {
                        meta.sub_metas
                            .into_values()
                            .find_map(|sub| sub.uuid.filter(|uuid| !uuid.is_empty()))
                    })
                })
            }),
        ];

        let resolved = first_success(&format!("sprite frame for {name}"), strategies).await;
        match &resolved {
            Some(uuid) => log::debug!("Resolved {name} to sprite frame {uuid}"),
            None => log::info!("No sprite frame found for {name} at {image_path}"),
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layout_protocol::{AssetMeta, HostCall, MemoryHost, SubMeta};
    use std::path::PathBuf;

    fn image() -> ImageAsset {
        ImageAsset {
            logical_name: "coin".into(),
            stored_path: PathBuf::from("/p/assets/ui/hud/coin.png"),
            relative_path: "hud/coin.png".into(),
        }
    }

    fn resolver(host: &Arc<MemoryHost>) -> SpriteFrameResolver {
        SpriteFrameResolver::new(host.clone(), "db://assets/ui/", &BindingProfile::default())
    }

    #[tokio::test]
    async fn sub_asset_lookup_comes_first() {
        let host = Arc::new(MemoryHost::empty());
        host.register_asset("db://assets/ui/hud/coin.png/spriteFrame", "frame-uuid");
        host.register_asset("db://assets/ui/hud/coin.png", "image-uuid");

        let frame = resolver(&host).resolve("coin", &image()).await;
        assert_eq!(frame.as_deref(), Some("frame-uuid"));
        assert_eq!(host.calls().len(), 1);
    }

    #[tokio::test]
    async fn image_uuid_gets_versioned_suffix() {
        let host = Arc::new(MemoryHost::empty());
        host.register_asset("db://assets/ui/hud/coin.png", "image-uuid");

        let frame = resolver(&host).resolve("coin", &image()).await;
        assert_eq!(frame.as_deref(), Some("image-uuid@f9941"));
    }

    #[tokio::test]
    async fn meta_scan_takes_first_declared_sub_asset() {
        let host = Arc::new(MemoryHost::empty());
        let mut meta = AssetMeta::default();
        meta.sub_metas.insert("texture".into(), SubMeta { uuid: None });
        meta.sub_metas.insert(
            "f9941".into(),
            SubMeta {
                uuid: Some("meta-frame".into()),
            },
        );
        meta.sub_metas.insert(
            "6c48a".into(),
            SubMeta {
                uuid: Some("meta-texture".into()),
            },
        );
        host.register_meta("db://assets/ui/hud/coin.png", meta);

        let frame = resolver(&host).resolve("coin", &image()).await;
        assert_eq!(frame.as_deref(), Some("meta-frame"));
    }

    #[tokio::test]
    async fn exhausted_lookups_are_unresolved() {
        let host = Arc::new(MemoryHost::empty());
        assert_eq!(resolver(&host).resolve("coin", &image()).await, None);
        assert_eq!(
            host.calls(),
            vec![
                HostCall::AssetInfo("db://assets/ui/hud/coin.png/spriteFrame".into()),
                HostCall::AssetInfo("db://assets/ui/hud/coin.png".into()),
                HostCall::AssetMeta("db://assets/ui/hud/coin.png".into()),
            ]
        );
    }
}
