//! Interleaved vertex data, and the layout describing it.

use byteorder::{ByteOrder, NativeEndian};
use cgmath::Point3;
use smallvec::SmallVec;

use crate::driver::types::{BufferUsage, ElementType, IndexType, Primitive};
use crate::errors::*;
use crate::shader::Semantic;

/// One stream of an interleaved vertex.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct VertexAttribute {
    pub semantic: Semantic,
    /// Distinguishes streams of the same semantic, e.g. the texture unit of coordinates.
    pub index: u32,
    /// The number of components per vertex.
    pub size: u8,
    /// The data type of each component.
    pub ty: ElementType,
    /// Whether fixed-point data values should be normalized.
    pub normalized: bool,
    /// The byte offset inside a vertex.
    pub offset: usize,
}

/// Geometry ready to be uploaded to vertex and index buffers.
#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    primitive: Primitive,
    usage: BufferUsage,
    attributes: SmallVec<[VertexAttribute; 8]>,
    stride: usize,
    vertices: Vec<u8>,
    vertex_count: usize,
    indices: Option<(IndexType, Vec<u8>)>,
    index_count: usize,
    bounds: (Point3<f32>, Point3<f32>),
    revision: u32,
}

impl Mesh {
    /// Creates a new `MeshBuilder`.
    #[inline]
    pub fn build<T: Into<String>>(name: T, primitive: Primitive) -> MeshBuilder {
        MeshBuilder::new(name, primitive)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    #[inline]
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Returns the stream of `semantic` with `index`.
    pub fn attribute(&self, semantic: Semantic, index: u32) -> Option<&VertexAttribute> {
        self.attributes
            .iter()
            .find(|v| v.semantic == semantic && v.index == index)
    }

    /// Whether the mesh has any stream of `semantic`.
    pub fn has(&self, semantic: Semantic) -> bool {
        self.attributes.iter().any(|v| v.semantic == semantic)
    }

    /// Stride of a single vertex.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn vertex_data(&self) -> &[u8] {
        &self.vertices
    }

    #[inline]
    pub fn index_type(&self) -> Option<IndexType> {
        self.indices.as_ref().map(|v| v.0)
    }

    #[inline]
    pub fn index_data(&self) -> Option<&[u8]> {
        self.indices.as_ref().map(|v| &v.1[..])
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// The number of vertices a draw call processes.
    pub fn element_count(&self) -> usize {
        if self.indices.is_some() {
            self.index_count
        } else {
            self.vertex_count
        }
    }

    /// The number of bone weights per vertex.
    pub fn bone_influences(&self) -> usize {
        self.attribute(Semantic::VertexBoneWeights, 0)
            .map(|v| v.size as usize)
            .unwrap_or(0)
    }

    /// The axis aligned bounds of the vertex locations, in model space.
    #[inline]
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        self.bounds
    }

    pub fn center(&self) -> Point3<f32> {
        let (min, max) = self.bounds;
        Point3::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5, (min.z + max.z) * 0.5)
    }

    /// Bumped every time the vertex data changes.
    #[inline]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Replaces the vertex data, keeping the layout and the vertex count.
    pub fn update_vertex_data(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.vertices.len() {
            return Err(Error::InvalidSettings(format!(
                "Mesh '{}' expects {} bytes of vertex data, found {}.",
                self.name,
                self.vertices.len(),
                data.len()
            )));
        }

        self.vertices.copy_from_slice(data);
        self.revision += 1;
        Ok(())
    }
}

pub struct MeshBuilder {
    name: String,
    primitive: Primitive,
    usage: BufferUsage,
    streams: Vec<(Semantic, u32, u8, Vec<f32>)>,
    indices: Option<Vec<u32>>,
}

impl MeshBuilder {
    pub fn new<T: Into<String>>(name: T, primitive: Primitive) -> Self {
        MeshBuilder {
            name: name.into(),
            primitive,
            usage: BufferUsage::Static,
            streams: Vec::new(),
            indices: None,
        }
    }

    pub fn usage(mut self, usage: BufferUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Sets a stream of `components` floats per vertex, replacing an earlier stream of the
    /// same semantic and index.
    pub fn stream(mut self, semantic: Semantic, index: u32, components: u8, data: Vec<f32>) -> Self {
        self.streams.retain(|v| !(v.0 == semantic && v.1 == index));
        self.streams.push((semantic, index, components, data));
        self
    }

    pub fn positions(self, v: &[[f32; 3]]) -> Self {
        self.stream(Semantic::VertexLocation, 0, 3, flatten(v))
    }

    pub fn normals(self, v: &[[f32; 3]]) -> Self {
        self.stream(Semantic::VertexNormal, 0, 3, flatten(v))
    }

    pub fn tangents(self, v: &[[f32; 3]]) -> Self {
        self.stream(Semantic::VertexTangent, 0, 3, flatten(v))
    }

    pub fn colors(self, v: &[[f32; 4]]) -> Self {
        self.stream(Semantic::VertexColor, 0, 4, flatten(v))
    }

    pub fn tex_coords(self, unit: u32, v: &[[f32; 2]]) -> Self {
        self.stream(Semantic::VertexTexture, unit, 2, flatten(v))
    }

    pub fn point_sizes(self, v: &[f32]) -> Self {
        self.stream(Semantic::VertexPointSize, 0, 1, v.to_vec())
    }

    /// Sets the skinning streams: `influences` bone weights and palette indices per vertex.
    pub fn bones(self, influences: u8, weights: Vec<f32>, indices: Vec<f32>) -> Self {
        self.stream(Semantic::VertexBoneWeights, 0, influences, weights)
            .stream(Semantic::VertexBoneIndices, 0, influences, indices)
    }

    pub fn indices(mut self, v: &[u32]) -> Self {
        self.indices = Some(v.to_vec());
        self
    }

    /// Interleaves the streams, in the order they were set.
    pub fn finish(self) -> Result<Mesh> {
        let invalid = |msg: String| Error::InvalidSettings(format!("Mesh '{}': {}", self.name, msg));

        let location = self
            .streams
            .iter()
            .find(|v| v.0 == Semantic::VertexLocation && v.2 == 3)
            .ok_or_else(|| invalid("has no 3D vertex locations.".into()))?;

        let vertex_count = location.3.len() / 3;
        let mut attributes: SmallVec<[VertexAttribute; 8]> = SmallVec::new();
        let mut stride = 0;

        for &(semantic, index, size, ref data) in &self.streams {
            if size == 0 || size > 4 {
                return Err(invalid(format!("{} has {} components.", semantic, size)));
            }

            if data.len() != vertex_count * size as usize {
                return Err(invalid(format!(
                    "{} holds {} values, {} expected.",
                    semantic,
                    data.len(),
                    vertex_count * size as usize
                )));
            }

            attributes.push(VertexAttribute {
                semantic,
                index,
                size,
                ty: ElementType::Float,
                normalized: false,
                offset: stride,
            });

            stride += size as usize * ElementType::Float.size();
        }

        let mut vertices = vec![0u8; stride * vertex_count];
        for (attribute, stream) in attributes.iter().zip(&self.streams) {
            let size = attribute.size as usize;
            for (i, v) in stream.3.chunks(size).enumerate() {
                let start = i * stride + attribute.offset;
                for (j, component) in v.iter().enumerate() {
                    NativeEndian::write_f32(&mut vertices[start + j * 4..], *component);
                }
            }
        }

        let mut min = Point3::new(0.0, 0.0, 0.0);
        let mut max = Point3::new(0.0, 0.0, 0.0);
        for (i, p) in location.3.chunks(3).enumerate() {
            if i == 0 {
                min = Point3::new(p[0], p[1], p[2]);
                max = min;
            } else {
                min = Point3::new(min.x.min(p[0]), min.y.min(p[1]), min.z.min(p[2]));
                max = Point3::new(max.x.max(p[0]), max.y.max(p[1]), max.z.max(p[2]));
            }
        }

        let (indices, index_count) = match self.indices {
            Some(ref v) => {
                if let Some(bad) = v.iter().find(|i| **i as usize >= vertex_count) {
                    return Err(invalid(format!("index {} is out of bounds.", bad)));
                }

                (Some(encode_indices(v)), v.len())
            }
            None => (None, 0),
        };

        Ok(Mesh {
            name: self.name,
            primitive: self.primitive,
            usage: self.usage,
            attributes,
            stride,
            vertices,
            vertex_count,
            indices,
            index_count,
            bounds: (min, max),
            revision: 0,
        })
    }
}

fn flatten<T: AsRef<[f32]>>(v: &[T]) -> Vec<f32> {
    v.iter().flat_map(|v| v.as_ref().iter().cloned()).collect()
}

/// Packs indices into the narrowest type that holds them.
fn encode_indices(v: &[u32]) -> (IndexType, Vec<u8>) {
    let max = v.iter().cloned().max().unwrap_or(0);
    let ty = if max <= ::std::u8::MAX as u32 {
        IndexType::U8
    } else if max <= ::std::u16::MAX as u32 {
        IndexType::U16
    } else {
        IndexType::U32
    };

    let mut bytes = vec![0u8; v.len() * ty.stride()];
    for (i, index) in v.iter().enumerate() {
        match ty {
            IndexType::U8 => bytes[i] = *index as u8,
            IndexType::U16 => NativeEndian::write_u16(&mut bytes[i * 2..], *index as u16),
            IndexType::U32 => NativeEndian::write_u32(&mut bytes[i * 4..], *index),
        }
    }

    (ty, bytes)
}

/// A quad of two triangles in the XY plane, centered at the origin.
pub fn quad<T: Into<String>>(name: T, width: f32, height: f32) -> Result<Mesh> {
    let (x, y) = (width * 0.5, height * 0.5);
    Mesh::build(name, Primitive::Triangles)
        .positions(&[[-x, -y, 0.0], [x, -y, 0.0], [x, y, 0.0], [-x, y, 0.0]])
        .normals(&[[0.0, 0.0, 1.0]; 4])
        .tex_coords(0, &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]])
        .indices(&[0, 1, 2, 0, 2, 3])
        .finish()
}

/// An axis aligned box, centered at the origin, with one normal per face.
pub fn cube<T: Into<String>>(name: T, size: f32) -> Result<Mesh> {
    let h = size * 0.5;
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut uvs = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (n, u, v) in &faces {
        let base = positions.len() as u32;
        for (s, t) in &[(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            positions.push([
                (n[0] + u[0] * s + v[0] * t) * h,
                (n[1] + u[1] * s + v[1] * t) * h,
                (n[2] + u[2] * s + v[2] * t) * h,
            ]);
            normals.push(*n);
            uvs.push([(s + 1.0) * 0.5, (t + 1.0) * 0.5]);
        }

        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh::build(name, Primitive::Triangles)
        .positions(&positions)
        .normals(&normals)
        .tex_coords(0, &uvs)
        .indices(&indices)
        .finish()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layout() {
        let mesh = Mesh::build("tri", Primitive::Triangles)
            .positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, -1.0]])
            .tex_coords(0, &[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]])
            .colors(&[[1.0; 4]; 3])
            .finish()
            .unwrap();

        assert_eq!(mesh.stride(), 36);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.vertex_data().len(), 108);
        assert_eq!(mesh.attribute(Semantic::VertexTexture, 0).unwrap().offset, 12);
        assert_eq!(mesh.attribute(Semantic::VertexColor, 0).unwrap().offset, 20);
        assert!(mesh.attribute(Semantic::VertexTexture, 1).is_none());
        assert!(mesh.has(Semantic::VertexColor));
        assert!(!mesh.has(Semantic::VertexNormal));
        assert_eq!(mesh.element_count(), 3);
        assert_eq!(mesh.bone_influences(), 0);
        assert_eq!(mesh.bounds(), (Point3::new(0.0, 0.0, -1.0), Point3::new(1.0, 2.0, 0.0)));
    }

    #[test]
    fn rewrite() {
        let mesh = Mesh::build("tri", Primitive::Points)
            .positions(&[[0.0; 3]])
            .point_sizes(&[4.0])
            .positions(&[[1.0, 2.0, 3.0]])
            .finish()
            .unwrap();

        assert_eq!(mesh.attributes().len(), 2);
        assert_eq!(mesh.attribute(Semantic::VertexLocation, 0).unwrap().offset, 4);
        assert_eq!(mesh.center(), Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn indices() {
        let mesh = quad("quad", 2.0, 2.0).unwrap();
        assert_eq!(mesh.index_type(), Some(IndexType::U8));
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.element_count(), 6);

        let mut v: Vec<u32> = (0..300).collect();
        v.push(299);
        let (ty, bytes) = encode_indices(&v);
        assert_eq!(ty, IndexType::U16);
        assert_eq!(bytes.len(), 602);

        let cube = cube("cube", 1.0).unwrap();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
    }

    #[test]
    fn invalid() {
        assert!(Mesh::build("empty", Primitive::Triangles).finish().is_err());

        let mesh = Mesh::build("short", Primitive::Triangles)
            .positions(&[[0.0; 3], [1.0; 3]])
            .normals(&[[0.0; 3]])
            .finish();
        assert!(mesh.is_err());

        let mesh = Mesh::build("oob", Primitive::Triangles)
            .positions(&[[0.0; 3]])
            .indices(&[0, 1, 0])
            .finish();
        assert!(mesh.is_err());
    }

    #[test]
    fn skin() {
        let mut mesh = Mesh::build("skin", Primitive::Triangles)
            .usage(BufferUsage::Dynamic)
            .positions(&[[0.0; 3]])
            .bones(2, vec![0.5, 0.5], vec![0.0, 1.0])
            .finish()
            .unwrap();

        assert_eq!(mesh.bone_influences(), 2);
        assert!(mesh.has(Semantic::VertexBoneIndices));

        let data = vec![0u8; mesh.vertex_data().len()];
        mesh.update_vertex_data(&data).unwrap();
        assert_eq!(mesh.revision(), 1);
        assert!(mesh.update_vertex_data(&[0u8; 3]).is_err());
    }
}
