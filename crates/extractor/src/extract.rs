// Per-map extraction.
//
// Drives one map through the pipeline: terrain (with lazily loaded stitch
// neighbors), static-mesh actors (cached per resource name), level BSP
// geometry and blocking volumes, all flattened into a list of placed
// entities over the shared mesh arena.

use std::collections::HashMap;

use crate::bsp::build_brush_mesh;
use crate::math::{Box3, Vec3};
use crate::mesh::{
    bounding_box_mesh, Entity, MeshArena, MeshHandle, SURFACE_STATIC_MESH, SURFACE_TERRAIN,
};
use crate::scene::{
    Level, Package, PackageProvider, StaticMeshActor, TerrainInfo, VolumeActor,
};
use crate::statics::build_static_mesh;
use crate::terrain::build_terrain_mesh;

/// One fully extracted map: entities reference meshes in the extractor's
/// arena. The bounding box is in the source convention.
#[derive(Debug)]
pub struct LoadedMap {
    pub name: String,
    pub bounding_box: Box3,
    pub entities: Vec<Entity>,
}

pub struct Extractor<'a> {
    provider: &'a dyn PackageProvider,
    arena: MeshArena,
    mesh_cache: HashMap<String, MeshHandle>,
    bb_mesh_cache: HashMap<String, MeshHandle>,
}

impl<'a> Extractor<'a> {
    pub fn new(provider: &'a dyn PackageProvider) -> Self {
        Self {
            provider,
            arena: MeshArena::default(),
            mesh_cache: HashMap::new(),
            bb_mesh_cache: HashMap::new(),
        }
    }

    pub fn arena(&self) -> &MeshArena {
        &self.arena
    }

    /// Extract every entity of one map package. `Ok(None)` means the
    /// package does not exist; data that violates the package invariants
    /// is an error.
    pub fn load_map(&mut self, name: &str) -> anyhow::Result<Option<LoadedMap>> {
        let Some(package) = self.provider.load_package(name)? else {
            return Ok(None);
        };

        let terrain = load_terrain(&package)?;
        let bounding_box = terrain.bounding_box.scaled(terrain.scale, terrain.position);

        let mut entities = Vec::new();

        if !terrain.broken_scale {
            self.load_terrain_entities(terrain, &mut entities)?;
        }

        self.load_mesh_actor_entities(&package, &mut entities);
        self.load_bsp_entities(&package, &bounding_box, &mut entities)?;
        self.load_volume_entities(&package, &mut entities);

        Ok(Some(LoadedMap { name: name.to_string(), bounding_box, entities }))
    }

    /// Neighbor terrain for stitching. Anything unusable - missing
    /// package, no terrain object, empty heightmap, broken scale - just
    /// disables stitching on that side.
    fn load_side_terrain(&self, x: i32, y: i32) -> anyhow::Result<Option<TerrainInfo>> {
        let package_name = format!("{x}_{y}");

        let Some(package) = self.provider.load_package(&package_name)? else {
            return Ok(None);
        };

        let Some(terrain) = package.iter::<TerrainInfo>().next() else {
            return Ok(None);
        };

        if terrain.heightmap.mips.first().map_or(true, |mip| mip.is_empty()) {
            return Ok(None);
        }

        if terrain.broken_scale {
            return Ok(None);
        }

        Ok(Some(terrain.clone()))
    }

    fn load_terrain_entities(
        &mut self,
        terrain: &TerrainInfo,
        entities: &mut Vec<Entity>,
    ) -> anyhow::Result<()> {
        let south = self.load_side_terrain(terrain.map_x, terrain.map_y + 1)?;
        let east = self.load_side_terrain(terrain.map_x + 1, terrain.map_y)?;
        let southeast = self.load_side_terrain(terrain.map_x + 1, terrain.map_y + 1)?;

        let mesh =
            build_terrain_mesh(terrain, south.as_ref(), east.as_ref(), southeast.as_ref());
        let bounding_box = mesh.bounding_box;

        // Terrain entity
        entities.push(Entity::new(self.arena.insert(mesh)));

        // Bounding box entity
        let bb_mesh = bounding_box_mesh(SURFACE_TERRAIN, bounding_box);
        let mut bb_entity = Entity::new(self.arena.insert(bb_mesh));
        bb_entity.wireframe = true;
        entities.push(bb_entity);

        Ok(())
    }

    fn load_mesh_actor_entities(&mut self, package: &Package, entities: &mut Vec<Entity>) {
        for actor in package.iter::<StaticMeshActor>() {
            if actor.delete_me || actor.hidden {
                continue;
            }

            let Some(mesh_name) = actor.static_mesh.as_deref() else {
                tracing::warn!("No static mesh for actor: {}", actor.name);
                continue;
            };

            let Some(resource) = package.mesh_resource(mesh_name) else {
                tracing::warn!(
                    "Static mesh {} missing from package {} (actor: {})",
                    mesh_name,
                    package.name,
                    actor.name
                );
                continue;
            };

            let bb_handle = match self.bb_mesh_cache.get(mesh_name) {
                Some(handle) => *handle,
                None => {
                    let bb_mesh =
                        bounding_box_mesh(SURFACE_STATIC_MESH, resource.bounding_box);
                    let handle = self.arena.insert(bb_mesh);
                    self.bb_mesh_cache.insert(mesh_name.to_string(), handle);
                    handle
                }
            };

            let mesh_handle = match self.mesh_cache.get(mesh_name) {
                Some(handle) => *handle,
                None => {
                    let handle = self.arena.insert(build_static_mesh(package, actor, resource));
                    self.mesh_cache.insert(mesh_name.to_string(), handle);
                    handle
                }
            };

            // Static mesh entity
            let mut entity = Entity::new(mesh_handle);
            place_actor(&mut entity, actor.position, actor.rotation, actor.scale);
            entities.push(entity);

            // Bounding box entity
            let mut bb_entity = Entity::new(bb_handle);
            bb_entity.wireframe = true;
            place_actor(&mut bb_entity, actor.position, actor.rotation, actor.scale);
            entities.push(bb_entity);
        }
    }

    fn load_bsp_entities(
        &mut self,
        package: &Package,
        map_bounding_box: &Box3,
        entities: &mut Vec<Entity>,
    ) -> anyhow::Result<()> {
        let mut found = false;

        for level in package.iter::<Level>() {
            found = true;

            if let Some(mesh) = build_brush_mesh(package, &level.model, Some(map_bounding_box)) {
                entities.push(Entity::new(self.arena.insert(mesh)));
            }
        }

        if !found {
            anyhow::bail!("No levels in package: {}", package.name);
        }

        Ok(())
    }

    fn load_volume_entities(&mut self, package: &Package, entities: &mut Vec<Entity>) {
        for volume in package.iter::<VolumeActor>() {
            let Some(brush) = &volume.brush else {
                continue;
            };

            // Volumes carry their own placement and skip the map bounds check.
            if let Some(mesh) = build_brush_mesh(package, brush, None) {
                let mut entity = Entity::new(self.arena.insert(mesh));
                place_actor(&mut entity, volume.position, volume.rotation, volume.scale);
                entities.push(entity);
            }
        }
    }
}

fn load_terrain(package: &Package) -> anyhow::Result<&TerrainInfo> {
    let Some(terrain) = package.iter::<TerrainInfo>().next() else {
        anyhow::bail!("No terrains in package: {}", package.name);
    };

    if terrain.heightmap.mips.first().map_or(true, |mip| mip.is_empty()) {
        anyhow::bail!("Can't load terrain heightmap in package: {}", package.name);
    }

    Ok(terrain)
}

fn place_actor(entity: &mut Entity, position: Vec3, rotation: Vec3, scale: Vec3) {
    entity.position = position;
    entity.rotation = rotation;
    entity.scale = scale;
}
