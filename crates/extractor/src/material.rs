// Material resolution.
//
// Every material kind eventually resolves to an innermost texture (or
// nothing). Chains are short and acyclic in healthy data; the depth bound
// turns a cyclic reference into a resolution failure instead of unbounded
// recursion.

use crate::scene::{MaterialKind, Package, Texture, TextureFormat};

const MAX_RESOLVE_DEPTH: usize = 16;

/// Default projection scale for brush UVs when no texture is available:
/// one repeat per 64 world units.
pub const DEFAULT_UV_SIZE: f32 = 64.0;

/// Resolve a material name to its underlying texture.
pub fn resolve_texture<'a>(package: &'a Package, name: &str) -> Option<&'a Texture> {
    resolve_inner(package, name, 0)
}

fn resolve_inner<'a>(package: &'a Package, name: &str, depth: usize) -> Option<&'a Texture> {
    if depth >= MAX_RESOLVE_DEPTH {
        tracing::warn!("Material chain too deep (cycle?) at: {}", name);
        return None;
    }

    let material = package.material(name)?;

    let follow = |next: &Option<String>| {
        next.as_deref().and_then(|next| resolve_inner(package, next, depth + 1))
    };

    match &material.kind {
        MaterialKind::Texture(texture) => {
            if texture.format == TextureFormat::Unknown {
                tracing::warn!("Unknown texture format for material: {}", name);
                return None;
            }
            Some(texture)
        }
        MaterialKind::Shader { diffuse } => follow(diffuse),
        MaterialKind::FinalBlend { material } => follow(material),
        MaterialKind::Modifier { material } => follow(material),
        MaterialKind::Combiner { material1, .. } => follow(material1),
    }
}

/// UV projection scale: the texture's pixel dimensions, or the fixed
/// world-unit default without one.
pub fn uv_size(texture: Option<&Texture>) -> (f32, f32) {
    match texture {
        Some(texture) => (texture.width as f32, texture.height as f32),
        None => (DEFAULT_UV_SIZE, DEFAULT_UV_SIZE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NamedMaterial, SceneObject};

    fn material(name: &str, kind: MaterialKind) -> SceneObject {
        SceneObject::Material(NamedMaterial { name: name.to_string(), kind })
    }

    fn texture(width: u32, height: u32) -> MaterialKind {
        MaterialKind::Texture(Texture { format: TextureFormat::Dxt1, width, height })
    }

    fn package(objects: Vec<SceneObject>) -> Package {
        Package { name: "test".to_string(), objects }
    }

    #[test]
    fn test_resolves_through_chain() {
        let package = package(vec![
            material("blend", MaterialKind::FinalBlend { material: Some("shader".to_string()) }),
            material("shader", MaterialKind::Shader { diffuse: Some("diffuse".to_string()) }),
            material("diffuse", texture(128, 64)),
        ]);

        let resolved = resolve_texture(&package, "blend").unwrap();
        assert_eq!((resolved.width, resolved.height), (128, 64));
    }

    #[test]
    fn test_combiner_takes_first_input() {
        let package = package(vec![
            material(
                "combiner",
                MaterialKind::Combiner {
                    material1: Some("a".to_string()),
                    material2: Some("b".to_string()),
                },
            ),
            material("a", texture(32, 32)),
            material("b", texture(512, 512)),
        ]);

        assert_eq!(resolve_texture(&package, "combiner").unwrap().width, 32);
    }

    #[test]
    fn test_cycle_fails_resolution() {
        let package = package(vec![
            material("a", MaterialKind::Modifier { material: Some("b".to_string()) }),
            material("b", MaterialKind::Modifier { material: Some("a".to_string()) }),
        ]);

        assert!(resolve_texture(&package, "a").is_none());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let package = package(vec![material(
            "weird",
            MaterialKind::Texture(Texture { format: TextureFormat::Unknown, width: 64, height: 64 }),
        )]);

        assert!(resolve_texture(&package, "weird").is_none());
        assert_eq!(uv_size(None), (DEFAULT_UV_SIZE, DEFAULT_UV_SIZE));
    }
}
