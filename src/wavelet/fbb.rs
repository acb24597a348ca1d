//! Fixed-block-boosting wavelet tree
//!
//! The input sequence is split into superblocks of `2^20` symbols; each
//! superblock picks its own power-of-two block size and Huffman codes every
//! block with a code fitted to the block's local distribution. The bit
//! vectors of all internal Huffman-tree nodes are concatenated in BFS order
//! per block and across blocks into a single rank-enabled [`RrrVector`] per
//! superblock. Hyperblocks of `2^32` symbols anchor absolute ranks in 64-bit
//! counters, so a rank query is three table lookups plus one bounded tree
//! walk.
//!
//! Supports up to 32,768 distinct symbols.

use crate::entropy::huffman::{assign_canonical_codes, compute_code_lengths, encoded_bit_length};
use crate::error::{Result, TextZipError};
use crate::io::{check_serial_version, DataInput, DataOutput};
use crate::succinct::{BitVector, RrrVector};

const SERIAL_VERSION: u8 = 0;

const SUPER_BLOCK_SIZE_LOG: u32 = 20;
const SUPER_BLOCK_SIZE: usize = 1 << SUPER_BLOCK_SIZE_LOG;
const HYPER_BLOCK_SIZE: usize = 1 << 32;

/// Serialized bytes of one fixed-size block header: three u32 and two u16.
const BLOCK_HEADER_ITEM_SIZE: usize = 14;

/// Fixed-size per-block header
struct BlockHeader {
    /// Rank of ones at the start of this block's bits in the superblock
    /// bit vector
    bv_rank: u32,
    /// Bit offset of this block's bits in the superblock bit vector
    bv_offset: u32,
    /// Byte offset of this block's variable-size header
    var_offset: u32,
    /// Block alphabet size minus one
    sigma: u16,
    /// Height of the block's Huffman tree (0 for a single-symbol block)
    tree_height: u16,
}

/// Per-superblock header: block headers, concatenated variable-size block
/// headers, superblock-to-block alphabet mapping and the rank support over
/// the concatenated node bit vectors.
struct SuperBlockHeader {
    /// Superblock alphabet size minus one
    sigma: u16,
    /// Chosen block size logarithm
    block_size_log: u16,
    /// Rank support over all blocks' Huffman-node bit vectors
    rank_support: RrrVector,
    blocks: Vec<BlockHeader>,
    var_headers: Vec<u8>,
    /// `mapping[sb_char << blocks_log | block]` is the block-local id, or
    /// the global `sigma - 1` when the symbol is absent from that block
    mapping: Vec<u16>,
}

/// Wavelet tree over a short-integer sequence with fixed-block boosting
pub struct FbbWavelet {
    size: usize,
    alphabet_size: usize,
    sample_rate: u32,
    /// Final symbol frequencies over the whole sequence
    count: Vec<u64>,
    /// Absolute ranks at each hyperblock boundary
    hyper_block_rank: Vec<u64>,
    /// Ranks at each superblock boundary, relative to the hyperblock
    super_block_rank: Vec<u32>,
    /// Global-to-superblock alphabet ids; `alphabet_size - 1` marks absence
    global_mapping: Vec<u16>,
    super_blocks: Vec<SuperBlockHeader>,
}

#[inline]
fn read_u16(data: &[u8], pos: usize) -> u64 {
    data[pos] as u64 | (data[pos + 1] as u64) << 8
}

#[inline]
fn read_u24(data: &[u8], pos: usize) -> u64 {
    data[pos] as u64 | (data[pos + 1] as u64) << 8 | (data[pos + 2] as u64) << 16
}

#[inline]
fn write_u16(data: &mut [u8], pos: usize, value: u64) {
    data[pos] = value as u8;
    data[pos + 1] = (value >> 8) as u8;
}

#[inline]
fn write_u24(data: &mut [u8], pos: usize, value: u64) {
    data[pos] = value as u8;
    data[pos + 1] = (value >> 8) as u8;
    data[pos + 2] = (value >> 16) as u8;
}

/// Reusable per-block construction buffers
#[derive(Default)]
struct BlockScratch {
    frequencies: Vec<u64>,
    code_lengths: Vec<u64>,
    codes: Vec<u64>,
    /// Per-superblock frequency matrix for the block-size search, one row
    /// per smallest-size block
    freq_rows: Vec<Vec<u64>>,
}

impl FbbWavelet {
    /// Builds the wavelet tree over `text` with the default RRR sampling
    /// rate of 64.
    pub fn new(text: &[u16]) -> Result<Self> {
        Self::with_sample_rate(text, 64)
    }

    /// Builds the wavelet tree over `text`. `sample_rate` is handed to the
    /// [`RrrVector`] rank support of every superblock.
    pub fn with_sample_rate(text: &[u16], sample_rate: u32) -> Result<Self> {
        if text.is_empty() {
            return Err(TextZipError::EmptyInput);
        }

        let size = text.len();
        let alphabet_size = text.iter().copied().max().unwrap_or(0) as usize + 1;
        let num_super_blocks = size.div_ceil(SUPER_BLOCK_SIZE);
        let num_hyper_blocks = size.div_ceil(HYPER_BLOCK_SIZE);

        let mut wavelet = Self {
            size,
            alphabet_size,
            sample_rate,
            count: vec![0; alphabet_size],
            hyper_block_rank: vec![0; num_hyper_blocks * alphabet_size],
            super_block_rank: vec![0; num_super_blocks * alphabet_size],
            global_mapping: vec![(alphabet_size - 1) as u16; num_super_blocks * alphabet_size],
            super_blocks: Vec::with_capacity(num_super_blocks),
        };

        let mut scratch = BlockScratch::default();
        for super_block_id in 0..num_super_blocks {
            wavelet.encode_super_block(text, super_block_id, &mut scratch)?;
        }
        Ok(wavelet)
    }

    /// Returns the length of the indexed sequence.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true for a zero-length sequence (construction rejects those).
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the alphabet size (maximum symbol value plus one).
    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    fn encode_super_block(
        &mut self,
        text: &[u16],
        super_block_id: usize,
        scratch: &mut BlockScratch,
    ) -> Result<()> {
        let sigma = self.alphabet_size;
        let super_block_beg = super_block_id * SUPER_BLOCK_SIZE;
        let super_block_end = (super_block_beg + SUPER_BLOCK_SIZE).min(self.size);
        let super_block_size = super_block_end - super_block_beg;
        let super_block = &text[super_block_beg..super_block_end];

        // Snapshot ranks at the hyperblock boundary.
        let hyper_block_id = super_block_beg / HYPER_BLOCK_SIZE;
        if super_block_beg % HYPER_BLOCK_SIZE == 0 {
            for c in 0..sigma {
                self.hyper_block_rank[hyper_block_id * sigma + c] = self.count[c];
            }
        }

        // Ranks at the superblock boundary, relative to the hyperblock.
        for c in 0..sigma {
            self.super_block_rank[super_block_id * sigma + c] =
                (self.count[c] - self.hyper_block_rank[hyper_block_id * sigma + c]) as u32;
        }

        // Update global symbol counts.
        for &symbol in super_block {
            self.count[symbol as usize] += 1;
        }

        // Superblock sigma and global-to-superblock mapping: a symbol occurs
        // in this superblock iff its count moved past the boundary snapshot.
        let mut super_block_sigma = 0usize;
        for c in 0..sigma {
            let at_boundary = self.super_block_rank[super_block_id * sigma + c] as u64
                + self.hyper_block_rank[hyper_block_id * sigma + c];
            if at_boundary != self.count[c] {
                self.global_mapping[super_block_id * sigma + c] = super_block_sigma as u16;
                super_block_sigma += 1;
            }
        }

        // Find the best block size by estimating the encoded size of the
        // whole superblock at each candidate power of two.
        let hi_log = SUPER_BLOCK_SIZE_LOG.min(16);
        let lo_log = SUPER_BLOCK_SIZE_LOG.saturating_sub(7).min(hi_log);
        let smallest_block_size = 1usize << lo_log;
        let max_blocks = SUPER_BLOCK_SIZE / smallest_block_size;

        scratch.freq_rows.resize_with(max_blocks, Vec::new);
        for row in scratch.freq_rows.iter_mut() {
            row.clear();
            row.resize(sigma, 0);
        }
        scratch.code_lengths.resize(sigma, 0);

        let mut best_block_size_log = lo_log;
        let mut best_encoding_size = usize::MAX;
        let mut compressed_bv_estimate = 0usize;
        let mut prev_uncompressed_bv_size = 0u64;

        for block_size_log in lo_log..=hi_log {
            let block_size = 1usize << block_size_log;
            let blocks_in_super_block = super_block_size.div_ceil(block_size);

            // Fixed-size block headers plus the superblock mapping.
            let mut encoding_size = BLOCK_HEADER_ITEM_SIZE * blocks_in_super_block
                + super_block_sigma * (SUPER_BLOCK_SIZE / block_size);

            if block_size_log == lo_log {
                for block_id in 0..blocks_in_super_block {
                    let block_beg = block_id * block_size;
                    let block_end = (block_beg + block_size).min(super_block_size);
                    let row = &mut scratch.freq_rows[block_id];
                    row.fill(0);
                    for &symbol in &super_block[block_beg..block_end] {
                        row[symbol as usize] += 1;
                    }
                }
            } else {
                // Merge pairs of the previous (half-sized) blocks.
                let prev_blocks = super_block_size.div_ceil(block_size / 2);
                let mut block_id = 0;
                while block_id < prev_blocks {
                    for c in 0..sigma {
                        let pair = scratch.freq_rows[block_id][c]
                            + if block_id + 1 < prev_blocks {
                                scratch.freq_rows[block_id + 1][c]
                            } else {
                                0
                            };
                        scratch.freq_rows[block_id >> 1][c] = pair;
                    }
                    block_id += 2;
                }
            }

            let mut uncompressed_bv_size = 0u64;
            for block_id in 0..blocks_in_super_block {
                let row = &scratch.freq_rows[block_id];
                let block_sigma = row.iter().filter(|&&f| f > 0).count();
                encoding_size += block_sigma * 5 + block_sigma.saturating_sub(1) * 2;

                compute_code_lengths(row, &mut scratch.code_lengths);
                let tree_height = scratch.code_lengths.iter().copied().max().unwrap_or(0);
                encoding_size += (tree_height.saturating_sub(1) * 4) as usize;

                uncompressed_bv_size += encoded_bit_length(row, &scratch.code_lengths);
            }

            if uncompressed_bv_size > 0 {
                if block_size_log == lo_log {
                    compressed_bv_estimate = RrrVector::estimated_size_for(
                        uncompressed_bv_size as usize,
                        self.sample_rate,
                    );
                } else {
                    let scaling = uncompressed_bv_size as f64 / prev_uncompressed_bv_size as f64;
                    compressed_bv_estimate = (compressed_bv_estimate as f64 * scaling) as usize;
                }
                encoding_size += compressed_bv_estimate;
            }
            prev_uncompressed_bv_size = uncompressed_bv_size;

            if block_size_log == lo_log || encoding_size < best_encoding_size {
                best_block_size_log = block_size_log;
                best_encoding_size = encoding_size;
            }
        }

        self.encode_blocks_in_super_block(
            text,
            super_block_id,
            best_block_size_log,
            super_block_sigma,
            scratch,
        )
    }

    fn encode_blocks_in_super_block(
        &mut self,
        text: &[u16],
        super_block_id: usize,
        block_size_log: u32,
        super_block_sigma: usize,
        scratch: &mut BlockScratch,
    ) -> Result<()> {
        let sigma = self.alphabet_size;
        let block_size = 1usize << block_size_log;
        let super_block_beg = super_block_id * SUPER_BLOCK_SIZE;
        let super_block_end = (super_block_beg + SUPER_BLOCK_SIZE).min(self.size);
        let super_block_size = super_block_end - super_block_beg;
        let super_block = &text[super_block_beg..super_block_end];

        let blocks_per_super_block = SUPER_BLOCK_SIZE / block_size;
        let mut mapping = vec![(sigma - 1) as u16; super_block_sigma * blocks_per_super_block];

        let blocks_in_super_block = super_block_size.div_ceil(block_size);
        let mut blocks: Vec<BlockHeader> = Vec::with_capacity(blocks_in_super_block);

        scratch.frequencies.resize(sigma, 0);
        scratch.code_lengths.resize(sigma, 0);
        scratch.codes.resize(sigma, 0);

        // First pass: fixed-size headers, superblock mapping, and the sizes
        // of the variable headers and the concatenated bit vector.
        let mut super_block_bv_size = 0u64;
        let mut var_header_size = 0usize;
        for block_id in 0..blocks_in_super_block {
            let block_beg = block_id * block_size;
            let block_end = (block_beg + block_size).min(super_block_size);
            let block = &super_block[block_beg..block_end];

            scratch.frequencies.fill(0);
            for &symbol in block {
                scratch.frequencies[symbol as usize] += 1;
            }
            compute_code_lengths(&scratch.frequencies, &mut scratch.code_lengths);

            let mut symbols: Vec<(u64, u16)> = (0..sigma)
                .filter(|&c| scratch.frequencies[c] > 0)
                .map(|c| (scratch.code_lengths[c], c as u16))
                .collect();
            symbols.sort_unstable();

            let block_sigma = symbols.len();
            let tree_height = scratch.code_lengths.iter().copied().max().unwrap_or(0);
            // a single-symbol block has all-zero code lengths and no bits
            let bv_size = encoded_bit_length(&scratch.frequencies, &scratch.code_lengths);

            blocks.push(BlockHeader {
                bv_rank: 0,
                bv_offset: super_block_bv_size as u32,
                var_offset: var_header_size as u32,
                sigma: (block_sigma - 1) as u16,
                tree_height: tree_height as u16,
            });

            // Superblock mapping for the symbols present in this block. A
            // block whose alphabet is the full global alphabet clamps its
            // last local id into the "absent" sentinel slot; the leaf-table
            // symbol check on the query path undoes the collision.
            for (local_id, &(_, c)) in symbols.iter().enumerate() {
                let super_block_char =
                    self.global_mapping[super_block_id * sigma + c as usize] as usize;
                let address = super_block_char * blocks_per_super_block + block_id;
                mapping[address] = local_id.min(sigma.saturating_sub(2)) as u16;
            }

            super_block_bv_size += bv_size;
            if tree_height > 1 {
                var_header_size += (tree_height as usize - 1) * 4;
            }
            var_header_size += block_sigma * 5 + (block_sigma - 1) * 2;
        }

        // Second pass: fill variable headers and the node bit vectors.
        let mut var_headers = vec![0u8; var_header_size];
        let mut super_block_bv = BitVector::zeroed(super_block_bv_size as usize);
        let mut block_rank = vec![0u64; sigma];
        let mut bv_rank = 0u64;

        for (block_id, header) in blocks.iter_mut().enumerate() {
            let block_beg = block_id * block_size;
            let block_end = (block_beg + block_size).min(super_block_size);
            let block = &super_block[block_beg..block_end];

            let ones = encode_block(
                block,
                sigma,
                &block_rank,
                &mut super_block_bv,
                header.bv_offset as u64,
                &mut var_headers,
                header.var_offset as usize,
                scratch,
            )?;
            header.bv_rank = bv_rank as u32;
            bv_rank += ones;

            for &symbol in block {
                block_rank[symbol as usize] += 1;
            }
        }

        let rank_support = RrrVector::new(&super_block_bv, self.sample_rate);
        self.super_blocks.push(SuperBlockHeader {
            sigma: (super_block_sigma - 1) as u16,
            block_size_log: block_size_log as u16,
            rank_support,
            blocks,
            var_headers,
            mapping,
        });
        Ok(())
    }

    /// Computes the rank of `symbol` in the range `[0, position)`.
    ///
    /// `position` clamps to the sequence length; symbols outside the
    /// alphabet rank 0.
    pub fn rank(&self, position: usize, symbol: u16) -> u64 {
        if position == 0 {
            return 0;
        }
        if symbol as usize >= self.alphabet_size {
            return 0;
        }
        if position >= self.size {
            return self.count[symbol as usize];
        }
        if self.alphabet_size == 1 {
            return position as u64;
        }

        let sigma = self.alphabet_size;
        let symbol_id = symbol as usize;
        let hyper_block_id = position / HYPER_BLOCK_SIZE;
        let super_block_id = position / SUPER_BLOCK_SIZE;
        let super_block_char = self.global_mapping[super_block_id * sigma + symbol_id] as usize;
        let super_block_index = position % SUPER_BLOCK_SIZE;
        let header = &self.super_blocks[super_block_id];
        let super_block_sigma = header.sigma as usize + 1;
        let block_size_log = header.block_size_log as u32;
        let block_size = 1usize << block_size_log;
        let blocks_in_super_block_log = SUPER_BLOCK_SIZE_LOG - block_size_log;
        let block_index = position & (block_size - 1);
        let current_block_size = block_size.min(self.size - (position - block_index));
        let mut block_id = super_block_index >> block_size_log;
        let rank_at_super_block = self.super_block_rank[super_block_id * sigma + symbol_id] as u64;
        let rank_at_hyper_block = self.hyper_block_rank[hyper_block_id * sigma + symbol_id];

        // symbol does not occur in this superblock
        if super_block_char >= super_block_sigma {
            return rank_at_hyper_block + rank_at_super_block;
        }

        let mapping_base = super_block_char << blocks_in_super_block_log;
        let block_c = header.mapping[mapping_base + block_id] as usize;

        if block_c == sigma - 1 {
            // symbol absent from this block: find the closest block to the
            // right in which it occurs
            block_id += 1;
            let blocks_in_super_block = 1usize << blocks_in_super_block_log;
            while block_id < blocks_in_super_block
                && header.mapping[mapping_base + block_id] as usize == sigma - 1
            {
                block_id += 1;
            }
            if block_id == blocks_in_super_block {
                // answer from the next superblock boundary or global counts
                if (super_block_id + 1) * SUPER_BLOCK_SIZE >= self.size {
                    return self.count[symbol_id];
                }
                return rank_at_hyper_block
                    + self.super_block_rank[(super_block_id + 1) * sigma + symbol_id] as u64;
            }
            let found_c = header.mapping[mapping_base + block_id] as usize;
            let block_header = &header.blocks[block_id];
            let leaf_base = block_header.var_offset as usize
                + (block_header.tree_height as usize).saturating_sub(1) * 4;
            let rank_at_block =
                read_leaf_rank(&header.var_headers, leaf_base, found_c, symbol_id as u64);
            return rank_at_hyper_block + rank_at_super_block + rank_at_block;
        }

        let block_header = &header.blocks[block_id];
        let var_offset = block_header.var_offset as usize;
        let tree_height = block_header.tree_height as usize;
        let leaf_base = var_offset + tree_height.saturating_sub(1) * 4;

        // rank at the block boundary, with the local id corrected when the
        // stored mapping was clamped
        let mut block_c = block_c;
        if read_u16(&header.var_headers, leaf_base + 5 * block_c) != symbol_id as u64 {
            block_c += 1;
        }
        let rank_at_block = read_u24(&header.var_headers, leaf_base + 5 * block_c + 2);

        // a single-symbol run needs no tree walk
        if tree_height == 0 {
            return rank_at_hyper_block + rank_at_super_block + rank_at_block + block_index as u64;
        }

        let (code, code_length) =
            restore_code(&header.var_headers, block_c as u64, var_offset, tree_height as u64);

        let vh = &header.var_headers;
        let block_sigma = block_header.sigma as u64 + 1;
        let mut bv_rank = block_header.bv_rank as u64;
        let mut bv_offset = block_header.bv_offset as u64;
        let mut internal_nodes = 1u64;
        let mut left_siblings = 0u64;
        let mut left_siblings_bv_size = 0u64;
        let mut node_bv_size = current_block_size as u64;
        let mut depth_total_bv_size = node_bv_size;
        let mut node_rank = block_index as u64;
        let mut nav_ptr = var_offset + (tree_height - 1) * 4 + block_sigma as usize * 5;
        let mut level_ptr = var_offset;

        for depth in 0..code_length {
            // number of 1s before the current offset within the current node
            let absolute = (bv_offset + left_siblings_bv_size + node_rank) as usize;
            let mut rank1 = header.rank_support.rank_ones(absolute) as u64;
            let left_ones = if left_siblings > 0 {
                read_u16(vh, nav_ptr + 2 * (left_siblings as usize - 1))
            } else {
                0
            };
            rank1 -= bv_rank + left_ones;

            let node_ones = read_u16(vh, nav_ptr + 2 * left_siblings as usize) - left_ones;
            let node_zeros = node_bv_size - node_ones;
            let rank0 = node_rank - rank1;

            bv_rank += read_u16(vh, nav_ptr + 2 * (internal_nodes as usize - 1));
            nav_ptr += 2 * internal_nodes as usize;
            left_siblings <<= 1;

            if code & (1 << (code_length - depth - 1)) != 0 {
                node_rank = rank1;
                node_bv_size = node_ones;
                left_siblings += 1;
                left_siblings_bv_size += node_zeros;
            } else {
                node_rank = rank0;
                node_bv_size = node_zeros;
            }

            if depth + 1 != code_length {
                let next_level_leaf_count = read_u16(vh, level_ptr);
                level_ptr += 2;
                let next_level_total_bv_size = read_u16(vh, level_ptr) + 1;
                level_ptr += 2;

                left_siblings_bv_size -= depth_total_bv_size - next_level_total_bv_size;
                bv_offset += depth_total_bv_size;
                depth_total_bv_size = next_level_total_bv_size;
                internal_nodes = (internal_nodes << 1) - next_level_leaf_count;
                left_siblings -= next_level_leaf_count;
            }
        }

        rank_at_hyper_block + rank_at_super_block + rank_at_block + node_rank
    }

    /// Returns `(rank(position + 1, T[position]), T[position])`: the symbol
    /// at `position` together with its occurrence count up to and including
    /// it. Positions past the end clamp to the last symbol.
    pub fn inverse_select(&self, position: usize) -> (u64, u16) {
        let position = position.min(self.size - 1);
        if self.alphabet_size == 1 {
            return (position as u64 + 1, 0);
        }

        let sigma = self.alphabet_size;
        let hyper_block_id = position / HYPER_BLOCK_SIZE;
        let super_block_id = position / SUPER_BLOCK_SIZE;
        let super_block_index = position % SUPER_BLOCK_SIZE;
        let header = &self.super_blocks[super_block_id];
        let block_size_log = header.block_size_log as u32;
        let block_size = 1usize << block_size_log;
        let block_index = position & (block_size - 1);
        let current_block_size = block_size.min(self.size - (position - block_index));
        let block_id = super_block_index >> block_size_log;
        let block_header = &header.blocks[block_id];
        let var_offset = block_header.var_offset as usize;
        let tree_height = block_header.tree_height as usize;
        let leaf_base = var_offset + tree_height.saturating_sub(1) * 4;
        let vh = &header.var_headers;

        if tree_height == 0 {
            let symbol = read_u16(vh, leaf_base) as usize;
            let rank_at_block = read_u24(vh, leaf_base + 2);
            let occurrence = self.hyper_block_rank[hyper_block_id * sigma + symbol]
                + self.super_block_rank[super_block_id * sigma + symbol] as u64
                + rank_at_block
                + block_index as u64;
            return (occurrence + 1, symbol as u16);
        }

        let block_sigma = block_header.sigma as u64 + 1;
        let mut code = 0u64;
        let mut code_length = 0u64;
        let mut bv_rank = block_header.bv_rank as u64;
        let mut bv_offset = block_header.bv_offset as u64;
        let mut internal_nodes = 1u64;
        let mut left_siblings = 0u64;
        let mut left_siblings_bv_size = 0u64;
        let mut node_bv_size = current_block_size as u64;
        let mut depth_total_bv_size = node_bv_size;
        let mut node_rank = block_index as u64;
        let mut nav_ptr = var_offset + (tree_height - 1) * 4 + block_sigma as usize * 5;
        let mut level_ptr = var_offset;

        let mut depth = 0usize;
        loop {
            let absolute = (bv_offset + left_siblings_bv_size + node_rank) as usize;
            let mut rank1 = header.rank_support.rank_ones(absolute) as u64;
            let next_bit = header.rank_support.get(absolute).unwrap_or(false);
            let left_ones = if left_siblings > 0 {
                read_u16(vh, nav_ptr + 2 * (left_siblings as usize - 1))
            } else {
                0
            };
            rank1 -= bv_rank + left_ones;

            let node_ones = read_u16(vh, nav_ptr + 2 * left_siblings as usize) - left_ones;
            let node_zeros = node_bv_size - node_ones;
            let rank0 = node_rank - rank1;

            bv_rank += read_u16(vh, nav_ptr + 2 * (internal_nodes as usize - 1));
            nav_ptr += 2 * internal_nodes as usize;
            left_siblings <<= 1;

            code <<= 1;
            code_length += 1;
            if next_bit {
                code |= 1;
                node_rank = rank1;
                node_bv_size = node_ones;
                left_siblings += 1;
                left_siblings_bv_size += node_zeros;
            } else {
                node_rank = rank0;
                node_bv_size = node_zeros;
            }

            if depth + 1 < tree_height {
                let next_level_leaf_count = read_u16(vh, level_ptr);
                level_ptr += 2;
                let next_level_total_bv_size = read_u16(vh, level_ptr) + 1;
                level_ptr += 2;

                left_siblings_bv_size -= depth_total_bv_size - next_level_total_bv_size;
                bv_offset += depth_total_bv_size;
                depth_total_bv_size = next_level_total_bv_size;
                internal_nodes = (internal_nodes << 1) - next_level_leaf_count;
                if left_siblings >= next_level_leaf_count {
                    left_siblings -= next_level_leaf_count;
                } else {
                    // the descended child is a leaf on the next level
                    break;
                }
            } else {
                break;
            }
            depth += 1;
        }

        let block_c = compute_symbol_from_levels(vh, var_offset, code, code_length);
        let symbol = read_u16(vh, leaf_base + 5 * block_c) as usize;
        let rank_at_block = read_u24(vh, leaf_base + 5 * block_c + 2);
        let occurrence = self.hyper_block_rank[hyper_block_id * sigma + symbol]
            + self.super_block_rank[super_block_id * sigma + symbol] as u64
            + rank_at_block
            + node_rank;
        (occurrence + 1, symbol as u16)
    }

    /// Serializes this wavelet tree to a [`DataOutput`].
    pub fn write<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_u8(SERIAL_VERSION)?;
        output.write_u64(self.size as u64)?;
        output.write_u32(self.alphabet_size as u32)?;
        output.write_u32(self.sample_rate)?;

        output.write_array_len(self.count.len())?;
        for &value in &self.count {
            output.write_u64(value)?;
        }
        output.write_array_len(self.hyper_block_rank.len())?;
        for &value in &self.hyper_block_rank {
            output.write_u64(value)?;
        }
        output.write_array_len(self.super_block_rank.len())?;
        for &value in &self.super_block_rank {
            output.write_u32(value)?;
        }
        output.write_array_len(self.global_mapping.len())?;
        for &value in &self.global_mapping {
            output.write_u16(value)?;
        }
        output.write_array_len(self.super_blocks.len())?;
        for super_block in &self.super_blocks {
            super_block.write(output)?;
        }
        Ok(())
    }

    /// Deserializes a wavelet tree from a [`DataInput`].
    pub fn read<R: DataInput>(input: &mut R) -> Result<Self> {
        check_serial_version(SERIAL_VERSION, input.read_u8()?)?;
        let size = input.read_u64()? as usize;
        let alphabet_size = input.read_u32()? as usize;
        let sample_rate = input.read_u32()?;

        let mut count = vec![0u64; input.read_array_len()?];
        for value in count.iter_mut() {
            *value = input.read_u64()?;
        }
        let mut hyper_block_rank = vec![0u64; input.read_array_len()?];
        for value in hyper_block_rank.iter_mut() {
            *value = input.read_u64()?;
        }
        let mut super_block_rank = vec![0u32; input.read_array_len()?];
        for value in super_block_rank.iter_mut() {
            *value = input.read_u32()?;
        }
        let mut global_mapping = vec![0u16; input.read_array_len()?];
        for value in global_mapping.iter_mut() {
            *value = input.read_u16()?;
        }
        let num_super_blocks = input.read_array_len()?;
        let mut super_blocks = Vec::with_capacity(num_super_blocks);
        for _ in 0..num_super_blocks {
            super_blocks.push(SuperBlockHeader::read(input)?);
        }

        Ok(Self {
            size,
            alphabet_size,
            sample_rate,
            count,
            hyper_block_rank,
            super_block_rank,
            global_mapping,
            super_blocks,
        })
    }
}

impl SuperBlockHeader {
    fn write<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_u16(self.sigma)?;
        output.write_u16(self.block_size_log)?;
        self.rank_support.write(output)?;
        output.write_array_len(self.blocks.len())?;
        for block in &self.blocks {
            output.write_u32(block.bv_rank)?;
            output.write_u32(block.bv_offset)?;
            output.write_u32(block.var_offset)?;
            output.write_u16(block.sigma)?;
            output.write_u16(block.tree_height)?;
        }
        output.write_array_len(self.var_headers.len())?;
        output.write_bytes(&self.var_headers)?;
        output.write_array_len(self.mapping.len())?;
        for &value in &self.mapping {
            output.write_u16(value)?;
        }
        Ok(())
    }

    fn read<R: DataInput>(input: &mut R) -> Result<Self> {
        let sigma = input.read_u16()?;
        let block_size_log = input.read_u16()?;
        let rank_support = RrrVector::read(input)?;
        let num_blocks = input.read_array_len()?;
        let mut blocks = Vec::with_capacity(num_blocks);
        for _ in 0..num_blocks {
            blocks.push(BlockHeader {
                bv_rank: input.read_u32()?,
                bv_offset: input.read_u32()?,
                var_offset: input.read_u32()?,
                sigma: input.read_u16()?,
                tree_height: input.read_u16()?,
            });
        }
        let var_header_len = input.read_array_len()?;
        let var_headers = input.read_vec(var_header_len)?;
        let mapping_len = input.read_array_len()?;
        let mut mapping = vec![0u16; mapping_len];
        for value in mapping.iter_mut() {
            *value = input.read_u16()?;
        }
        Ok(Self { sigma, block_size_log, rank_support, blocks, var_headers, mapping })
    }
}

/// Reads the rank-at-block-boundary of `symbol` from a block's leaf table,
/// bumping the local id when the stored mapping was clamped into the
/// "absent" sentinel slot.
fn read_leaf_rank(var_headers: &[u8], leaf_base: usize, local_id: usize, symbol: u64) -> u64 {
    let mut local_id = local_id;
    if read_u16(var_headers, leaf_base + 5 * local_id) != symbol {
        local_id += 1;
    }
    read_u24(var_headers, leaf_base + 5 * local_id + 2)
}

/// Reconstructs the canonical code of block-local symbol `block_c` from the
/// per-level leaf counts of the variable-size block header.
fn restore_code(var_headers: &[u8], block_c: u64, level_base: usize, tree_height: u64) -> (u64, u64) {
    let mut code = 0u64;
    let mut code_length = 1u64;
    let mut leaf_count = 0u64;
    let mut ptr = level_base;

    while code_length < tree_height {
        code <<= 1;
        let level_leaf_count = read_u16(var_headers, ptr);
        if leaf_count + level_leaf_count > block_c {
            code += block_c - leaf_count;
            break;
        }
        code += level_leaf_count;
        code_length += 1;
        leaf_count += level_leaf_count;
        ptr += 4;
    }
    if code_length == tree_height {
        code <<= 1;
        code += block_c - leaf_count;
    }
    (code, code_length)
}

/// Recovers the block-local symbol id from an accumulated code and its
/// length, using the per-level leaf counts.
fn compute_symbol_from_levels(var_headers: &[u8], level_base: usize, code: u64, code_length: u64) -> usize {
    let mut block_c = 0i64;
    let mut temp_code = 0i64;
    let mut ptr = level_base;
    for _ in 1..code_length {
        let level_leaf_count = read_u16(var_headers, ptr) as i64;
        ptr += 4;
        temp_code += level_leaf_count;
        block_c += level_leaf_count;
        temp_code <<= 1;
    }
    (block_c + code as i64 - temp_code) as usize
}

/// Encodes one block: computes its canonical Huffman code, fills the
/// internal-node bit vectors into `super_block_bv` starting at `bv_offset`,
/// and writes the variable-size header at `var_offset`. Returns the number
/// of 1-bits contributed.
#[allow(clippy::too_many_arguments)]
fn encode_block(
    block: &[u16],
    sigma: usize,
    block_rank: &[u64],
    super_block_bv: &mut BitVector,
    bv_offset: u64,
    var_headers: &mut [u8],
    var_offset: usize,
    scratch: &mut BlockScratch,
) -> Result<u64> {
    scratch.frequencies.fill(0);
    for &symbol in block {
        scratch.frequencies[symbol as usize] += 1;
    }
    compute_code_lengths(&scratch.frequencies, &mut scratch.code_lengths);
    assign_canonical_codes(&scratch.frequencies, &scratch.code_lengths, &mut scratch.codes);
    let frequencies = &scratch.frequencies;
    let code_lengths = &scratch.code_lengths;
    let codes = &scratch.codes;
    let max_code_length = code_lengths.iter().copied().max().unwrap_or(0);

    let present: Vec<usize> = (0..sigma).filter(|&c| frequencies[c] > 0).collect();
    let mut ones_count = 0u64;
    let mut ones_in_bv: Vec<u64> = Vec::new();

    if present.len() > 1 {
        // Internal node ids take their bits from the root-to-node path
        // (first path bit is the MSB) prepended with 1. Sorted ids are BFS
        // order, which is the order the bit vectors are concatenated in,
        // and a sibling of id x is x ^ 1.
        let mut internal_node_ids: Vec<u64> = Vec::new();
        for &c in &present {
            for depth in 0..code_lengths[c] {
                let id = ((1u64 << code_lengths[c]) | codes[c]) >> (code_lengths[c] - depth);
                internal_node_ids.push(id);
            }
        }
        internal_node_ids.sort_unstable();
        internal_node_ids.dedup();

        let mut node_bv_id = vec![0u64; 1usize << max_code_length];
        for (index, &id) in internal_node_ids.iter().enumerate() {
            node_bv_id[id as usize] = index as u64;
        }

        let mut node_bv_size = vec![0u64; internal_node_ids.len()];
        for &c in &present {
            for depth in 0..code_lengths[c] {
                let id = ((1u64 << code_lengths[c]) | codes[c]) >> (code_lengths[c] - depth);
                node_bv_size[node_bv_id[id as usize] as usize] += frequencies[c];
            }
        }

        let mut node_bv: Vec<BitVector> =
            node_bv_size.iter().map(|&s| BitVector::zeroed(s as usize)).collect();
        ones_in_bv = vec![0u64; internal_node_ids.len()];
        let mut node_visit_count = vec![0u64; 1usize << (max_code_length + 1)];

        for (i, &symbol) in block.iter().enumerate() {
            let c = symbol as usize;
            let length = code_lengths[c];
            let code = codes[c];
            let mut pos = i as u64;
            for depth in 0..length {
                let id = ((1u64 << length) | code) >> (length - depth);
                if depth > 0 {
                    pos -= node_visit_count[(id ^ 1) as usize];
                    node_visit_count[id as usize] += 1;
                }
                if code & (1u64 << (length - depth - 1)) != 0 {
                    let bv_index = node_bv_id[id as usize] as usize;
                    node_bv[bv_index].set(pos as usize, true)?;
                    ones_in_bv[bv_index] += 1;
                    ones_count += 1;
                }
            }
            node_visit_count[((1u64 << length) | code) as usize] += 1;
        }

        // Concatenate the node bit vectors in BFS order.
        let mut offset = bv_offset as usize;
        for bv in &node_bv {
            for j in 0..bv.len() {
                if bv.get(j).unwrap_or(false) {
                    super_block_bv.set(offset, true)?;
                }
                offset += 1;
            }
        }
    }

    // Variable-size block header.

    // Leaf count per level, excluding the deepest level.
    let mut code_length_frequency = vec![0u64; max_code_length as usize];
    for &c in &present {
        if code_lengths[c] < max_code_length {
            code_length_frequency[code_lengths[c] as usize] += 1;
        }
    }

    // level_total_frequency[d]: total frequency of symbols with code length
    // longer than d, i.e. the total bit-vector length at depth d.
    let mut level_total_frequency = vec![0u64; max_code_length as usize];
    for &c in &present {
        for depth in 1..code_lengths[c] {
            level_total_frequency[depth as usize] += frequencies[c];
        }
    }

    // Per level (except the root and deepest): leaf count and total
    // bit-vector size minus one, two bytes each.
    let mut byte_ptr = var_offset;
    for depth in 1..max_code_length as usize {
        write_u16(var_headers, byte_ptr, code_length_frequency[depth]);
        write_u16(var_headers, byte_ptr + 2, level_total_frequency[depth] - 1);
        byte_ptr += 4;
    }

    // Per leaf in (length, symbol) order: the global symbol and its rank at
    // the block boundary relative to the superblock. Three rank bytes limit
    // the superblock size to 2^24.
    let mut symbols: Vec<(u64, u16)> =
        present.iter().map(|&c| (code_lengths[c], c as u16)).collect();
    symbols.sort_unstable();
    for &(_, c) in &symbols {
        write_u16(var_headers, byte_ptr, c as u64);
        write_u24(var_headers, byte_ptr + 2, block_rank[c as usize]);
        byte_ptr += 5;
    }

    // Per internal node in BFS order: cumulative 1-bit count of the node
    // and all its left siblings on the same level (excluding leaves).
    let mut internal_nodes_current_level = 1u64;
    let mut ptr = 0usize;
    for depth in 0..max_code_length {
        let mut one_bits_current_level = 0u64;
        for _ in 0..internal_nodes_current_level {
            one_bits_current_level += ones_in_bv[ptr];
            ptr += 1;
            write_u16(var_headers, byte_ptr, one_bits_current_level);
            byte_ptr += 2;
        }
        if depth + 1 != max_code_length {
            let next_level_leaf_count = code_length_frequency[depth as usize + 1];
            internal_nodes_current_level =
                (internal_nodes_current_level << 1) - next_level_leaf_count;
        }
    }

    Ok(ones_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_text(text: &str) -> (Vec<u16>, impl Fn(char) -> u16) {
        // first-appearance mapping like the FM-Index uses, but local to the
        // tests; unknown symbols map to u16::MAX
        let mut map = std::collections::HashMap::new();
        let mut mapped = Vec::new();
        for c in text.chars() {
            let next = map.len() as u16;
            let id = *map.entry(c).or_insert(next);
            mapped.push(id);
        }
        (mapped, move |c: char| map.get(&c).copied().unwrap_or(u16::MAX))
    }

    fn naive_rank(mapped: &[u16], pos: usize, symbol: u16) -> u64 {
        mapped[..pos.min(mapped.len())].iter().filter(|&&s| s == symbol).count() as u64
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(FbbWavelet::new(&[]).is_err());
    }

    #[test]
    fn test_single_symbol() {
        let wavelet = FbbWavelet::new(&[5]).unwrap();
        assert_eq!(wavelet.rank(1, 5), 1);
        assert_eq!(wavelet.rank(1, 4), 0);
        assert_eq!(wavelet.rank(1, 100), 0);
        assert_eq!(wavelet.inverse_select(0), (1, 5));
    }

    #[test]
    fn test_small_text_ranks() {
        let text = "aloha what a string this is string is eh";
        let (mapped, map) = map_text(text);
        let wavelet = FbbWavelet::new(&mapped).unwrap();

        assert_eq!(wavelet.rank(6, map('a')), 2);
        assert_eq!(wavelet.rank(text.len(), map('a')), 4);
        assert_eq!(wavelet.rank(text.len(), map('h')), 4);
        assert_eq!(wavelet.rank(19, map('i')), 1);
        assert_eq!(wavelet.rank(0, map('i')), 0);
        assert_eq!(wavelet.inverse_select(0).1, map('a'));
        assert_eq!(wavelet.inverse_select(5).1, map(' '));
    }

    #[test]
    fn test_rank_of_missing_symbol() {
        let (mapped, map) = map_text("aloha what a string this is string is eh");
        let wavelet = FbbWavelet::new(&mapped).unwrap();
        assert_eq!(map('Z'), u16::MAX);
        assert_eq!(wavelet.rank(22, map('Z')), 0);
    }

    #[test]
    fn test_all_values_equal() {
        let text = vec![1u16; 100];
        let wavelet = FbbWavelet::new(&text).unwrap();
        assert_eq!(wavelet.inverse_select(0).1, 1);
        assert_eq!(wavelet.inverse_select(5).1, 1);
        assert_eq!(wavelet.rank(100, 1), 100);
        assert_eq!(wavelet.rank(42, 1), 42);
        assert_eq!(wavelet.rank(42, 0), 0);
    }

    #[test]
    fn test_rank_clamps_past_end() {
        let mut text = vec![3u16; 30_000];
        text[28_000] = 2;
        let wavelet = FbbWavelet::new(&text).unwrap();
        assert_eq!(wavelet.rank(90_000, 2), 1);
        assert_eq!(wavelet.rank(90_000, 3), 29_999);
    }

    #[test]
    fn test_rank_across_superblocks() {
        // spans three superblocks; the rare symbol lives in the middle one
        let mut text = vec![1u16; 3_000_000];
        text[2_800_000] = 2;
        let wavelet = FbbWavelet::new(&text).unwrap();
        assert_eq!(wavelet.rank(6_900_000, 2), 1);
        assert_eq!(wavelet.rank(1_000_000, 2), 0);
        assert_eq!(wavelet.rank(2_800_001, 2), 1);
        assert_eq!(wavelet.rank(2_800_000, 2), 0);
        assert_eq!(wavelet.rank(1_000_000, 1), 1_000_000);
    }

    #[test]
    fn test_rank_in_first_superblock_with_early_symbol() {
        let mut text = vec![1u16; 3_000_000];
        text[100] = 2;
        let wavelet = FbbWavelet::new(&text).unwrap();
        assert_eq!(wavelet.rank(1_000_000, 2), 1);
        assert_eq!(wavelet.rank(100, 2), 0);
        assert_eq!(wavelet.rank(101, 2), 1);
    }

    #[test]
    fn test_inverse_select_round_trip() {
        let (mapped, _) = map_text(
            "To Sherlock Holmes she is always the woman. I have seldom heard him \
             mention her under any other name. In his eyes she eclipses and \
             predominates the whole of her sex.",
        );
        let wavelet = FbbWavelet::new(&mapped).unwrap();
        for (i, &symbol) in mapped.iter().enumerate() {
            let (occurrence, decoded) = wavelet.inverse_select(i);
            assert_eq!(decoded, symbol, "symbol at {}", i);
            assert_eq!(occurrence, naive_rank(&mapped, i + 1, symbol), "occurrence at {}", i);
        }
    }

    #[test]
    fn test_rank_against_naive_on_mixed_text() {
        let (mapped, _) = map_text(
            "Chodzą jeże koło wieży, 操據支救数料新方旅日旦时映時智更最月有服未本材来東 \
             spotkał je tam pewien Jerzyk.",
        );
        let wavelet = FbbWavelet::new(&mapped).unwrap();
        for pos in 0..=mapped.len() {
            for symbol in 0..wavelet.alphabet_size() as u16 {
                assert_eq!(
                    wavelet.rank(pos, symbol),
                    naive_rank(&mapped, pos, symbol),
                    "rank({}, {})",
                    pos,
                    symbol
                );
            }
        }
    }

    #[test]
    fn test_utf8_prefix_counts() {
        let text = "Chodzą jeże koło wieży, 操據支救数料新方旅日旦时映時智更最月有服未本材来東 \
                    spotkał je tam pewien Jerzyk.";
        let (mapped, map) = map_text(text);
        let wavelet = FbbWavelet::new(&mapped).unwrap();
        let chars: Vec<char> = text.chars().collect();
        let naive = |c: char, until: usize| {
            chars[..until].iter().filter(|&&x| x == c).count() as u64
        };
        assert_eq!(wavelet.rank(36, map('ł')), naive('ł', 36));
        assert_eq!(wavelet.rank(68, map('最')), naive('最', 68));
        assert_eq!(wavelet.rank(12, map('人')), 0);
    }

    #[test]
    fn test_serialization_round_trip() {
        let (mapped, _) = map_text("the quick brown fox jumps over the lazy dog and again");
        let wavelet = FbbWavelet::with_sample_rate(&mapped, 16).unwrap();

        let mut out = crate::io::VecDataOutput::new();
        wavelet.write(&mut out).unwrap();
        let bytes = out.into_vec();

        let mut input = crate::io::SliceDataInput::new(&bytes);
        let restored = FbbWavelet::read(&mut input).unwrap();
        assert_eq!(restored.len(), wavelet.len());
        assert_eq!(restored.alphabet_size(), wavelet.alphabet_size());
        for pos in 0..=mapped.len() {
            for symbol in 0..wavelet.alphabet_size() as u16 {
                assert_eq!(restored.rank(pos, symbol), wavelet.rank(pos, symbol));
            }
        }
        for pos in 0..mapped.len() {
            assert_eq!(restored.inverse_select(pos), wavelet.inverse_select(pos));
        }
    }

    #[test]
    fn test_large_alphabet() {
        // several hundred distinct symbols in a short text exercises the
        // per-block mapping including the clamped last local id
        let text: Vec<u16> = (0..2048u16).map(|i| (i * 7) % 700).collect();
        let wavelet = FbbWavelet::new(&text).unwrap();
        for pos in (0..=text.len()).step_by(97) {
            for symbol in (0..700u16).step_by(13) {
                assert_eq!(
                    wavelet.rank(pos, symbol),
                    naive_rank(&text, pos, symbol),
                    "rank({}, {})",
                    pos,
                    symbol
                );
            }
        }
        for pos in 0..text.len() {
            assert_eq!(wavelet.inverse_select(pos).1, text[pos]);
        }
    }
}
