use crate::fallback::{accepted, first_success, Strategy};
use layout_protocol::{NodeHandle, PropertyDump, SceneHost, SceneScript, SettlePolicy};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Names the editor uses for the sprite component and its properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingProfile {
    pub component: String,
    pub frame_property: String,
    pub frame_type: String,
    pub size_mode_property: String,
    pub size_mode_type: String,
    /// Size mode that keeps the texture's own dimensions.
    pub raw_size_mode: i64,
    /// Scene script tried before any property write.
    pub script: String,
    /// Sub-asset holding an image's sprite frame.
    pub sub_asset: String,
    /// Appended to an image uuid to form its sprite frame uuid.
    pub frame_suffix: String,
}

impl Default for BindingProfile {
    fn default() -> Self {
        Self {
            component: "cc.Sprite".to_string(),
            frame_property: "spriteFrame".to_string(),
            frame_type: "cc.SpriteFrame".to_string(),
            size_mode_property: "sizeMode".to_string(),
            size_mode_type: "cc.Sprite.SizeMode".to_string(),
            raw_size_mode: 2,
            script: "set-sprite".to_string(),
            sub_asset: "spriteFrame".to_string(),
            frame_suffix: "@f9941".to_string(),
        }
    }
}

/// Attaches a sprite frame to a node, tolerating hosts that support only
/// some of the write paths.
pub struct SpriteBinder {
    host: Arc<dyn SceneHost>,
    profile: BindingProfile,
    settle: SettlePolicy,
}

impl SpriteBinder {
    pub fn new(host: Arc<dyn SceneHost>, profile: BindingProfile, settle: SettlePolicy) -> Self {
        Self {
            host,
            profile,
            settle,
        }
    }

    /// True when the component exists and the frame landed through one of
    /// the write paths. The size mode is written regardless and its outcome
    /// does not count.
    pub async fn bind(&self, node: &NodeHandle, frame: &str) -> bool {
        let Some(index) = self.ensure_component(node).await else {
            log::warn!(
                "No {} component on {node}, sprite frame not set",
                self.profile.component
            );
            return false;
        };

        let frame_set = self.write_frame(node, frame, index).await;
        if !frame_set {
            log::warn!("Could not set sprite frame {frame} on {node}");
        }
        if !self.write_size_mode(node, index).await {
            log::debug!("Size mode left unchanged on {node}");
        }
        frame_set
    }

    /// Index of the first matching component, creating one when absent.
    async fn ensure_component(&self, node: &NodeHandle) -> Option<usize> {
        if let Some(index) = self.component_index(node).await {
            return Some(index);
        }

        if let Err(e) = self
            .host
            .create_component(node, &self.profile.component)
            .await
        {
            log::warn!("create-component {} on {node} failed: {e}", self.profile.component);
        }
        self.settle.after_component_create().await;
        self.component_index(node).await
    }

    async fn component_index(&self, node: &NodeHandle) -> Option<usize> {
        match self.host.query_node(node).await {
            Ok(Some(dump)) => dump.component_index(&self.profile.component),
            Ok(None) => None,
            Err(e) => {
                log::debug!("query-node {node} failed: {e}");
                None
            }
        }
    }

    async fn write_frame(&self, node: &NodeHandle, frame: &str, index: usize) -> bool {
        let profile = &self.profile;
        let host = &self.host;
        let public = format!("__comps__.{index}.{}", profile.frame_property);
        let backing = format!("__comps__.{index}._{}", profile.frame_property);

        let script = SceneScript {
            name: profile.script.clone(),
            method: "run".to_string(),
            args: vec![json!(node.as_str()), json!(frame), json!(index)],
        };

        let strategies = vec![
            Strategy::new(format!("script {}", profile.script), async move {
                accepted(host.execute_scene_script(script).await)
            }),
            Strategy::new(public.clone(), async {
                let dump = PropertyDump::asset_ref(&profile.frame_type, frame, true);
                accepted(host.set_property(node, &public, dump).await)
            }),
            Strategy::new(backing.clone(), async {
                let dump = PropertyDump::asset_ref(&profile.frame_type, frame, false);
                accepted(host.set_property(node, &backing, dump).await)
            }),
        ];
        first_success("sprite frame", strategies).await.is_some()
    }

    async fn write_size_mode(&self, node: &NodeHandle, index: usize) -> bool {
        let profile = &self.profile;
        let host = &self.host;
        let public = format!("__comps__.{index}.{}", profile.size_mode_property);
        let backing = format!("__comps__.{index}._{}", profile.size_mode_property);

        let strategies = vec![
            Strategy::new(public.clone(), async {
                let dump = PropertyDump::new(&profile.size_mode_type, json!(profile.raw_size_mode));
                accepted(host.set_property(node, &public, dump).await)
            }),
            Strategy::new(backing.clone(), async {
                let dump = PropertyDump::integer(profile.raw_size_mode);
                accepted(host.set_property(node, &backing, dump).await)
            }),
        ];
        first_success("size mode", strategies).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layout_protocol::{HostCall, MemoryBehavior, MemoryHost, SceneNode};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn host(behavior: MemoryBehavior) -> Arc<MemoryHost> {
        let scene = SceneNode::new("scene", "root").with_child(SceneNode::new("Icon", "icon"));
        Arc::new(MemoryHost::from_snapshot(&scene).with_behavior(behavior))
    }

    fn binder(host: &Arc<MemoryHost>) -> SpriteBinder {
        SpriteBinder::new(
            host.clone(),
            BindingProfile::default(),
            SettlePolicy::immediate(),
        )
    }

    #[tokio::test]
    async fn script_path_wins_when_supported() {
        let host = host(MemoryBehavior {
            scripts: true,
            ..MemoryBehavior::default()
        });
        let node = NodeHandle::from("icon");

        assert!(binder(&host).bind(&node, "frame-1").await);

        let set_frames = host
            .calls()
            .into_iter()
            .filter(|call| {
                matches!(call, HostCall::SetProperty { path, .. } if path.contains("priteFrame"))
            })
            .count();
        assert_eq!(set_frames, 0);
        assert_eq!(
            host.property(&node, "__comps__.0.spriteFrame"),
            Some(json!({"uuid": "frame-1"}))
        );
        assert_eq!(host.component_types(&node), vec!["cc.Sprite"]);
    }

    #[tokio::test]
    async fn falls_back_to_backing_field_spelling() {
        let host = host(MemoryBehavior {
            rejected_paths: vec![".spriteFrame".into(), ".sizeMode".into()],
            ..MemoryBehavior::default()
        });
        let node = NodeHandle::from("icon");

        assert!(binder(&host).bind(&node, "frame-2").await);

        let paths: Vec<String> = host
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::SetProperty { path, .. } => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(
            paths,
            vec![
                "__comps__.0.spriteFrame",
                "__comps__.0._spriteFrame",
                "__comps__.0.sizeMode",
                "__comps__.0._sizeMode",
            ]
        );
        assert_eq!(
            host.property(&node, "__comps__.0.sizeMode"),
            Some(json!(2))
        );
    }

    #[tokio::test]
    async fn every_frame_path_refused_is_not_a_bind() {
        let host = host(MemoryBehavior {
            rejected_paths: vec!["priteFrame".into()],
            ..MemoryBehavior::default()
        });
        assert!(!binder(&host).bind(&"icon".into(), "frame-3").await);
    }

    #[tokio::test]
    async fn existing_component_is_reused() {
        let host = host(MemoryBehavior::default());
        let node = NodeHandle::from("icon");
        host.create_component(&node, "cc.UITransform").await.unwrap();
        host.create_component(&node, "cc.Sprite").await.unwrap();

        assert!(binder(&host).bind(&node, "frame-4").await);
        assert_eq!(host.component_types(&node), vec!["cc.UITransform", "cc.Sprite"]);
        assert_eq!(
            host.property(&node, "__comps__.1.spriteFrame"),
            Some(json!({"uuid": "frame-4", "__expectedType__": "cc.SpriteFrame"}))
        );
    }
}
